//! InMemoryTaskRepository - 開発用・テスト用のタスクリポジトリ
//!
//! # 実装詳細
//! - Task / Job / 「現在スケジュール中」の集合を 1 つの RwLock で保持
//! - Task に job_id があれば、その Job の task_ids にも登録する

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{Job, JobId, Task, TaskId};
use crate::ports::TaskRepository;

#[derive(Default)]
struct RepositoryState {
    tasks: HashMap<TaskId, Task>,
    jobs: HashMap<JobId, Job>,
    scheduled: HashSet<TaskId>,
}

impl RepositoryState {
    fn insert_task(&mut self, task: Task, scheduled: bool) {
        if let Some(job_id) = task.job_id {
            self.jobs
                .entry(job_id)
                .or_insert_with(|| Job::new(job_id))
                .add_task(task.id);
        }
        if scheduled {
            self.scheduled.insert(task.id);
        } else {
            self.scheduled.remove(&task.id);
        }
        self.tasks.insert(task.id, task);
    }
}

#[derive(Default)]
pub struct InMemoryTaskRepository {
    state: RwLock<RepositoryState>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository where every given task is currently scheduled.
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut state = RepositoryState::default();
        for task in tasks {
            state.insert_task(task, true);
        }
        Self {
            state: RwLock::new(state),
        }
    }

    /// Insert or replace a task and mark it as scheduled.
    pub async fn insert_task(&self, task: Task) {
        self.state.write().await.insert_task(task, true);
    }

    /// Insert or replace a task that is known but not on the active schedule.
    pub async fn insert_unscheduled_task(&self, task: Task) {
        self.state.write().await.insert_task(task, false);
    }

    /// Register a job with no tasks yet (or replace an existing one).
    pub async fn insert_job(&self, job: Job) {
        self.state.write().await.jobs.insert(job.id, job);
    }

    /// Delete a task. Its job keeps existing.
    pub async fn remove_task(&self, id: TaskId) -> Option<Task> {
        let mut state = self.state.write().await;
        state.scheduled.remove(&id);
        let removed = state.tasks.remove(&id)?;
        if let Some(job) = removed.job_id.and_then(|job_id| state.jobs.get_mut(&job_id)) {
            job.remove_task(id);
        }
        Some(removed)
    }

    pub async fn set_scheduled(&self, id: TaskId, scheduled: bool) {
        let mut state = self.state.write().await;
        if scheduled && state.tasks.contains_key(&id) {
            state.scheduled.insert(id);
        } else {
            state.scheduled.remove(&id);
        }
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn get_task(&self, id: TaskId) -> Option<Task> {
        self.state.read().await.tasks.get(&id).cloned()
    }

    async fn get_tasks_for_job(&self, job_id: JobId) -> Vec<Task> {
        let state = self.state.read().await;
        let Some(job) = state.jobs.get(&job_id) else {
            return Vec::new();
        };
        job.task_ids
            .iter()
            .filter_map(|id| state.tasks.get(id).cloned())
            .collect()
    }

    async fn is_task_currently_scheduled(&self, id: TaskId) -> bool {
        self.state.read().await.scheduled.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskKind;

    #[tokio::test]
    async fn tasks_are_grouped_by_job_in_insertion_order() {
        let job = JobId::new(1);
        let repo = InMemoryTaskRepository::from_tasks([
            Task::recording(TaskId::new(11)).with_job(job),
            Task::recording(TaskId::new(12)),
            Task::recording(TaskId::new(13)).with_job(job),
        ]);

        let tasks = repo.get_tasks_for_job(job).await;
        let ids: Vec<TaskId> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![TaskId::new(11), TaskId::new(13)]);
        assert!(repo.get_tasks_for_job(JobId::new(2)).await.is_empty());
    }

    #[tokio::test]
    async fn removed_task_no_longer_resolves() {
        let job = JobId::new(1);
        let repo = InMemoryTaskRepository::new();
        repo.insert_task(Task::recording(TaskId::new(1)).with_job(job)).await;

        let removed = repo.remove_task(TaskId::new(1)).await;
        assert_eq!(removed.map(|t| t.kind), Some(TaskKind::Recording));
        assert_eq!(repo.get_task(TaskId::new(1)).await, None);
        assert!(!repo.is_task_currently_scheduled(TaskId::new(1)).await);
        assert!(repo.get_tasks_for_job(job).await.is_empty());
    }

    #[tokio::test]
    async fn scheduled_flag_can_be_toggled() {
        let repo = InMemoryTaskRepository::new();
        repo.insert_unscheduled_task(Task::reminder(TaskId::new(5))).await;
        assert!(!repo.is_task_currently_scheduled(TaskId::new(5)).await);

        repo.set_scheduled(TaskId::new(5), true).await;
        assert!(repo.is_task_currently_scheduled(TaskId::new(5)).await);

        // unknown tasks never become scheduled
        repo.set_scheduled(TaskId::new(6), true).await;
        assert!(!repo.is_task_currently_scheduled(TaskId::new(6)).await);
    }

    #[tokio::test]
    async fn empty_job_is_known_but_has_no_tasks() {
        let repo = InMemoryTaskRepository::new();
        repo.insert_job(Job::new(JobId::new(3))).await;
        assert!(repo.get_tasks_for_job(JobId::new(3)).await.is_empty());
    }
}
