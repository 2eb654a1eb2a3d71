//! Conflict set: subject -> conflicting tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{JobId, TaskId};
use super::task::Task;

/// What a conflict query was asked about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ConflictSubject {
    Task(TaskId),
    /// A batch of candidate tasks checked together.
    Tasks(Vec<TaskId>),
    Job(JobId),
    Time(DateTime<Utc>),
}

/// Deduplicated conflicting tasks for one subject, in first-discovered order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictSet {
    pub subject: ConflictSubject,
    pub tasks: Vec<Task>,
}

impl ConflictSet {
    pub fn new(subject: ConflictSubject, tasks: Vec<Task>) -> Self {
        Self { subject, tasks }
    }

    pub fn empty(subject: ConflictSubject) -> Self {
        Self::new(subject, Vec::new())
    }

    /// An empty set means "safe to schedule".
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task_ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|task| task.id).collect()
    }
}
