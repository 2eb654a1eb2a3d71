//! Task and TaskKind.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{JobId, TaskId};

/// Kind of a schedulable task.
///
/// Only `Reminder` does not hold a tuner or a recording slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    Recording,
    Reminder,
    ReviewBufferRecording,
    Live,
}

impl TaskKind {
    pub fn consumes_resources(self) -> bool {
        !matches!(self, TaskKind::Reminder)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Recording => "RECORDING",
            TaskKind::Reminder => "REMINDER",
            TaskKind::ReviewBufferRecording => "REVIEW_BUFFER_RECORDING",
            TaskKind::Live => "LIVE",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An atomic schedulable unit.
///
/// Owned by the task repository; the coordinator only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,

    /// Back-reference to the recurring job that spawned this task.
    pub job_id: Option<JobId>,
}

impl Task {
    pub fn new(id: TaskId, kind: TaskKind) -> Self {
        Self {
            id,
            kind,
            job_id: None,
        }
    }

    pub fn recording(id: TaskId) -> Self {
        Self::new(id, TaskKind::Recording)
    }

    pub fn reminder(id: TaskId) -> Self {
        Self::new(id, TaskKind::Reminder)
    }

    pub fn with_job(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }

    pub fn is_recording(&self) -> bool {
        self.kind == TaskKind::Recording
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::recording(TaskKind::Recording, true)]
    #[case::reminder(TaskKind::Reminder, false)]
    #[case::review_buffer(TaskKind::ReviewBufferRecording, true)]
    #[case::live(TaskKind::Live, true)]
    fn only_reminders_are_resource_free(#[case] kind: TaskKind, #[case] expected: bool) {
        assert_eq!(kind.consumes_resources(), expected);
    }

    #[test]
    fn kind_uses_scheduler_wire_names() {
        let json = serde_json::to_string(&TaskKind::ReviewBufferRecording).unwrap();
        assert_eq!(json, "\"REVIEW_BUFFER_RECORDING\"");
        assert_eq!(TaskKind::ReviewBufferRecording.to_string(), "REVIEW_BUFFER_RECORDING");
    }

    #[test]
    fn with_job_sets_back_reference() {
        let task = Task::recording(TaskId::new(1)).with_job(JobId::new(9));
        assert_eq!(task.job_id, Some(JobId::new(9)));
        assert!(task.is_recording());
    }
}
