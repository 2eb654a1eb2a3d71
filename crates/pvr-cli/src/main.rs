use std::error::Error;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::oneshot;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pvr_core::domain::{ConflictSet, OptionGroup, Task, TaskId, TaskKind};
use pvr_core::impls::{InMemoryTaskRepository, Script, ScriptedScheduler, TimeOptions};
use pvr_core::ports::{IdGenerator, SequentialGenerator, SystemClock, UlidGenerator};
use pvr_core::{ConflictQuery, CoordinatorBuilder, CoordinatorConfig};

fn print_set(label: &str, set: &ConflictSet) -> Result<(), serde_json::Error> {
    if set.is_empty() {
        println!("{label}: no conflicts");
        return Ok(());
    }
    info!(label, task_ids = ?set.task_ids(), "conflicts found");
    println!("{label}: {}", serde_json::to_string_pretty(set)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pvr_core=debug,pvr_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // (A) 設定: 引数があれば JSON ファイルから読む
    let config = match std::env::args().nth(1) {
        Some(path) => CoordinatorConfig::from_json_file(&path)?,
        None => CoordinatorConfig::default_v1(),
    };
    info!(timeout_ms = config.query_timeout_ms, "configuration loaded");

    // (B) タスクを用意（録画 3 件 + リマインダー 1 件、うち 2 件は同じ Job）
    let ids = SequentialGenerator::new();
    let job = ids.generate_job_id();
    let news = ids.generate_task_id();
    let film = ids.generate_task_id();
    let match_day = ids.generate_task_id();
    let reminder = ids.generate_task_id();

    let repository = Arc::new(InMemoryTaskRepository::from_tasks([
        Task::recording(news).with_job(job),
        Task::recording(film).with_job(job),
        Task::recording(match_day),
        Task::reminder(reminder),
    ]));

    // (C) スケジューラの応答を台本で用意
    let scheduler = Arc::new(ScriptedScheduler::with_id_generator(Arc::new(
        UlidGenerator::new(SystemClock),
    )));
    scheduler.set_overlaps(news, vec![film, match_day]).await;
    scheduler.set_overlaps(film, vec![news]).await;
    scheduler.set_overlaps(match_day, vec![news, reminder]).await;
    scheduler
        .script_overlap_options(
            news,
            Script::Respond(vec![OptionGroup::from(vec![film]), OptionGroup::from(vec![match_day])]),
        )
        .await;

    let at = Utc::now();
    scheduler
        .script_options_at(
            at,
            Script::Respond(TimeOptions::new(
                vec![OptionGroup::new(vec![news]), OptionGroup::new(vec![reminder])],
                vec![(news, TaskKind::Recording), (reminder, TaskKind::Reminder)],
            )),
        )
        .await;

    // (D) Coordinator を構築
    let coordinator = Arc::new(
        CoordinatorBuilder::new()
            .repository(repository)
            .scheduler(scheduler)
            .config(config)
            .build()?,
    );

    // (E) 各操作を実行
    print_set("task", &coordinator.conflicts(ConflictQuery::ForTask(news)).await)?;
    print_set(
        "tasks",
        &coordinator
            .conflicts(ConflictQuery::ForTasks(vec![news, film]))
            .await,
    )?;
    print_set("job", &coordinator.conflicts(ConflictQuery::ForJob(job)).await)?;
    print_set("time", &coordinator.conflicts(ConflictQuery::AtTime(at)).await)?;

    for task_id in [news, film] {
        let conflicting = coordinator.is_task_conflicting(task_id).await;
        println!("{task_id} conflicting: {conflicting}");
    }

    // (F) コールバック版: 結果は oneshot で受け取る
    let (tx, rx) = oneshot::channel::<ConflictSet>();
    let handle = coordinator.spawn_conflicts(ConflictQuery::ForTask(match_day), move |set| {
        let _ = tx.send(set);
    });
    handle.await?;
    print_set("callback", &rx.await?)?;

    let unknown = TaskId::new(u128::from(u64::MAX));
    coordinator
        .spawn_is_task_conflicting(unknown, move |conflicting| {
            info!(task_id = %unknown, conflicting, "callback fired");
        })
        .await?;

    Ok(())
}
