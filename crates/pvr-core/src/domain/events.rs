//! Events - scheduler から非同期に届くレスポンス
//!
//! Scheduler はクエリを受け付けると即座に handle を返し、結果は後から
//! 共有のイベントストリームに流します。イベントの到着順は保証されません。
//!
//! # レスポンス種別
//! - `Overlap`: 指定タスクと時間的に重なるタスク ID の列
//! - `Options`: 同時に実行可能なタスクの組（OptionGroup）の列

use serde::{Deserialize, Serialize};

use super::errors::SchedulerFault;
use super::ids::{RequestHandle, TaskId};
use super::task::TaskKind;

/// Which event family a query is answered with.
///
/// The correlator tracks one awaited handle per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Overlap,
    Options,
}

/// One resource-feasible combination of tasks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionGroup(Vec<TaskId>);

impl OptionGroup {
    pub fn new(task_ids: Vec<TaskId>) -> Self {
        Self(task_ids)
    }

    pub fn task_ids(&self) -> &[TaskId] {
        &self.0
    }

    pub fn contains(&self, task_id: TaskId) -> bool {
        self.0.contains(&task_id)
    }
}

impl From<Vec<TaskId>> for OptionGroup {
    fn from(task_ids: Vec<TaskId>) -> Self {
        Self(task_ids)
    }
}

/// Answer to an overlaps-for-task query.
///
/// `overlapping_task_ids` is not deduplicated by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapResult {
    pub handle: RequestHandle,
    pub error: Option<SchedulerFault>,
    pub overlapping_task_ids: Vec<TaskId>,
}

/// Answer to an all-options-at-time or overlap-options-for-task query.
///
/// `all_task_ids` and `all_task_kinds` are parallel; overlap-options
/// responses may leave both empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsResult {
    pub handle: RequestHandle,
    pub error: Option<SchedulerFault>,
    pub task_option_groups: Vec<OptionGroup>,
    #[serde(default)]
    pub all_task_ids: Vec<TaskId>,
    #[serde(default)]
    pub all_task_kinds: Vec<TaskKind>,
}

/// An event on the scheduler's shared stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchedulerEvent {
    Overlap(OverlapResult),
    Options(OptionsResult),
}

impl SchedulerEvent {
    pub fn handle(&self) -> RequestHandle {
        match self {
            SchedulerEvent::Overlap(result) => result.handle,
            SchedulerEvent::Options(result) => result.handle,
        }
    }

    pub fn error(&self) -> Option<&SchedulerFault> {
        match self {
            SchedulerEvent::Overlap(result) => result.error.as_ref(),
            SchedulerEvent::Options(result) => result.error.as_ref(),
        }
    }

    pub fn kind(&self) -> ResponseKind {
        match self {
            SchedulerEvent::Overlap(_) => ResponseKind::Overlap,
            SchedulerEvent::Options(_) => ResponseKind::Options,
        }
    }
}
