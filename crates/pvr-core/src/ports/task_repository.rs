//! TaskRepository port - Task / Job の正本（source of truth）
//!
//! Task と Job はこのリポジトリ（と scheduler）だけが作成・更新します。
//! Coordinator は読み取り専用で、ID を Task レコードに解決するためだけに使います。

use async_trait::async_trait;

use crate::domain::{JobId, Task, TaskId};

/// TaskRepository は Task と Job を ID で引く
///
/// # 設計原則
/// - 見つからない ID は `None`（エラーではない）
/// - クエリ中にタスクが削除されることがある
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn get_task(&self, id: TaskId) -> Option<Task>;

    /// Tasks currently produced by `job_id`; empty for unknown jobs.
    async fn get_tasks_for_job(&self, job_id: JobId) -> Vec<Task>;

    /// Whether the task is part of the active schedule.
    async fn is_task_currently_scheduled(&self, id: TaskId) -> bool;
}
