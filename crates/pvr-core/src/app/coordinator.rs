//! ConflictCoordinator - 録画競合検出の公開ファサード
//!
//! UI / アプリケーション層から呼ばれる 5 つの操作を提供します。
//! 各操作は独立していて、呼び出しごとに新しい `RequestCorrelator`
//! （と必要なら `ConflictAccumulator`）を作ります。
//!
//! # 失敗時の方針（fail-open）
//! - 発行失敗・scheduler のエラー・タイムアウト・ストリーム終了は
//!   そのサブクエリについて「競合なし」として扱う
//! - 呼び出し元にエラーは返さない。結果は必ず 1 回だけ返る
//!
//! # 操作
//! 1. `conflicts_for_task`: 1 タスクの overlap クエリ
//! 2. `conflicts_for_tasks`: 候補タスクの逐次ファンアウト
//! 3. `conflicts_for_job`: Job のタスクに対して 2 を実行
//! 4. `conflicts_at_time`: ある時刻の全組み合わせ（リマインダー除外後に 2 組以上なら競合）
//! 5. `is_task_conflicting`: スケジュール中のタスクの組み合わせが 2 組以上か

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::CoordinatorConfig;
use crate::conflict::{
    ConflictAccumulator, RequestCorrelator, filter_reminder_groups, indicates_conflict, kind_index,
};
use crate::domain::{
    ConflictSet, ConflictSubject, JobId, OptionsResult, RequestHandle, ResponseKind,
    SchedulerError, SchedulerEvent, Task, TaskId, TaskKind,
};
use crate::ports::{SchedulerService, TaskRepository};

/// A conflict question for the callback surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictQuery {
    ForTask(TaskId),
    ForTasks(Vec<TaskId>),
    ForJob(JobId),
    AtTime(DateTime<Utc>),
}

impl ConflictQuery {
    pub fn subject(&self) -> ConflictSubject {
        match self {
            ConflictQuery::ForTask(task_id) => ConflictSubject::Task(*task_id),
            ConflictQuery::ForTasks(task_ids) => ConflictSubject::Tasks(task_ids.clone()),
            ConflictQuery::ForJob(job_id) => ConflictSubject::Job(*job_id),
            ConflictQuery::AtTime(at) => ConflictSubject::Time(*at),
        }
    }
}

pub struct ConflictCoordinator {
    repository: Arc<dyn TaskRepository>,
    scheduler: Arc<dyn SchedulerService>,
    config: CoordinatorConfig,
}

impl ConflictCoordinator {
    pub fn new(
        repository: Arc<dyn TaskRepository>,
        scheduler: Arc<dyn SchedulerService>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            repository,
            scheduler,
            config,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Recording tasks overlapping `task_id`, excluding the task itself.
    pub async fn conflicts_for_task(&self, task_id: TaskId) -> Vec<Task> {
        let mut correlator = self.correlator();
        let overlaps = self.overlaps_for(&mut correlator, task_id).await;

        let mut seen = HashSet::new();
        let ids: Vec<TaskId> = overlaps
            .into_iter()
            .filter(|id| *id != task_id && seen.insert(*id))
            .collect();
        let conflicts: Vec<Task> = self
            .resolve(ids)
            .await
            .into_iter()
            .filter(Task::is_recording)
            .collect();

        debug!(%task_id, conflicts = conflicts.len(), "conflicts for task");
        conflicts
    }

    /// Union of the tasks overlapping any of `task_ids`, queried one at a time.
    pub async fn conflicts_for_tasks(&self, task_ids: &[TaskId]) -> Vec<Task> {
        let Some(&subject) = task_ids.first() else {
            debug!("no candidate tasks, nothing to query");
            return Vec::new();
        };

        let mut correlator = self.correlator();
        let mut accumulator = ConflictAccumulator::new(task_ids.to_vec(), subject);
        while let Some(probe) = accumulator.current_probe() {
            let overlaps = self.overlaps_for(&mut correlator, probe).await;
            accumulator.absorb(&overlaps);
        }

        let conflicts = self.resolve(accumulator.into_conflicts()).await;
        debug!(
            candidates = task_ids.len(),
            conflicts = conflicts.len(),
            "conflicts for tasks"
        );
        conflicts
    }

    pub async fn conflicts_for_job(&self, job_id: JobId) -> Vec<Task> {
        let task_ids: Vec<TaskId> = self
            .repository
            .get_tasks_for_job(job_id)
            .await
            .iter()
            .map(|task| task.id)
            .collect();
        if task_ids.is_empty() {
            debug!(%job_id, "job has no tasks");
            return Vec::new();
        }
        self.conflicts_for_tasks(&task_ids).await
    }

    /// Recording tasks in conflict at `at`, using the configured kind exclusions.
    pub async fn conflicts_at_time(&self, at: DateTime<Utc>) -> Vec<Task> {
        self.conflicts_at_time_excluding(at, &[], &self.config.time_query_excluded_kinds)
            .await
    }

    /// Like `conflicts_at_time`, with caller-chosen exclusions passed to the scheduler.
    pub async fn conflicts_at_time_excluding(
        &self,
        at: DateTime<Utc>,
        exclude_ids: &[TaskId],
        exclude_kinds: &[TaskKind],
    ) -> Vec<Task> {
        let mut correlator = self.correlator();
        let query = self
            .scheduler
            .query_all_options_at_time(at, exclude_ids, exclude_kinds);
        let Some(result) = self.options_for(&mut correlator, query).await else {
            return Vec::new();
        };

        let kinds = kind_index(&result.all_task_ids, &result.all_task_kinds);
        let groups = filter_reminder_groups(&kinds, result.task_option_groups);
        if !indicates_conflict(&groups) {
            debug!(%at, groups = groups.len(), "no conflict at time");
            return Vec::new();
        }

        // ids missing from the kind table are judged by the repository record
        let mut seen = HashSet::new();
        let ids: Vec<TaskId> = groups
            .iter()
            .flat_map(|group| group.task_ids().iter().copied())
            .filter(|id| {
                kinds.get(id).is_none_or(|kind| *kind == TaskKind::Recording) && seen.insert(*id)
            })
            .collect();
        let conflicts: Vec<Task> = self
            .resolve(ids)
            .await
            .into_iter()
            .filter(|task| kinds.contains_key(&task.id) || task.is_recording())
            .collect();
        debug!(%at, groups = groups.len(), conflicts = conflicts.len(), "conflicts at time");
        conflicts
    }

    /// Whether a scheduled task has more than one viable option group.
    pub async fn is_task_conflicting(&self, task_id: TaskId) -> bool {
        if !self.repository.is_task_currently_scheduled(task_id).await {
            debug!(%task_id, "task is not scheduled, cannot conflict");
            return false;
        }

        let mut correlator = self.correlator();
        let query = self
            .scheduler
            .query_overlap_options_for_task(task_id, self.config.overlap_option_flags);
        let conflicting = self
            .options_for(&mut correlator, query)
            .await
            .is_some_and(|result| indicates_conflict(&result.task_option_groups));
        debug!(%task_id, conflicting, "task conflict check");
        conflicting
    }

    pub async fn conflicts(&self, query: ConflictQuery) -> ConflictSet {
        let subject = query.subject();
        let tasks = match query {
            ConflictQuery::ForTask(task_id) => self.conflicts_for_task(task_id).await,
            ConflictQuery::ForTasks(task_ids) => self.conflicts_for_tasks(&task_ids).await,
            ConflictQuery::ForJob(job_id) => self.conflicts_for_job(job_id).await,
            ConflictQuery::AtTime(at) => self.conflicts_at_time(at).await,
        };
        ConflictSet::new(subject, tasks)
    }

    /// Run `query` in the background and hand the result to `callback` exactly once.
    pub fn spawn_conflicts<F>(self: &Arc<Self>, query: ConflictQuery, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(ConflictSet) + Send + 'static,
    {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let conflicts = coordinator.conflicts(query).await;
            callback(conflicts);
        })
    }

    pub fn spawn_is_task_conflicting<F>(self: &Arc<Self>, task_id: TaskId, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(bool) + Send + 'static,
    {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let conflicting = coordinator.is_task_conflicting(task_id).await;
            callback(conflicting);
        })
    }

    fn correlator(&self) -> RequestCorrelator {
        RequestCorrelator::subscribe(self.scheduler.as_ref(), self.config.query_timeout())
    }

    async fn overlaps_for(&self, correlator: &mut RequestCorrelator, task_id: TaskId) -> Vec<TaskId> {
        let query = self.scheduler.query_overlaps_for_task(task_id);
        match correlator.round_trip(ResponseKind::Overlap, query).await {
            Ok(SchedulerEvent::Overlap(result)) => result.overlapping_task_ids,
            Ok(SchedulerEvent::Options(_)) => Vec::new(),
            Err(failure) => {
                warn!(%task_id, error = %failure, "overlap query failed, treating as no overlaps");
                Vec::new()
            }
        }
    }

    async fn options_for<F>(&self, correlator: &mut RequestCorrelator, query: F) -> Option<OptionsResult>
    where
        F: Future<Output = Result<RequestHandle, SchedulerError>>,
    {
        match correlator.round_trip(ResponseKind::Options, query).await {
            Ok(SchedulerEvent::Options(result)) => Some(result),
            Ok(SchedulerEvent::Overlap(_)) => None,
            Err(failure) => {
                warn!(error = %failure, "options query failed, treating as no conflict");
                None
            }
        }
    }

    /// Resolve ids to task records; ids that no longer resolve are dropped.
    async fn resolve(&self, ids: Vec<TaskId>) -> Vec<Task> {
        let mut tasks = Vec::with_capacity(ids.len());
        for id in ids {
            match self.repository.get_task(id).await {
                Some(task) => tasks.push(task),
                None => debug!(%id, "dropping task that no longer resolves"),
            }
        }
        tasks
    }
}
