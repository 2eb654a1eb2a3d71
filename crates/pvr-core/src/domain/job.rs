//! Job record: a recurring recording definition.

use serde::{Deserialize, Serialize};

use super::ids::{JobId, TaskId};

/// A recurring definition that produces zero or more tasks over time.
///
/// One Job -> many Tasks. The task list is maintained by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub task_ids: Vec<TaskId>,
}

impl Job {
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            task_ids: Vec::new(),
        }
    }

    /// Add a task to this job. Adding the same task twice is a no-op.
    pub fn add_task(&mut self, task_id: TaskId) {
        if !self.task_ids.contains(&task_id) {
            self.task_ids.push(task_id);
        }
    }

    pub fn remove_task(&mut self, task_id: TaskId) {
        self.task_ids.retain(|id| *id != task_id);
    }

    pub fn is_empty(&self) -> bool {
        self.task_ids.is_empty()
    }
}
