//! SchedulerService port - 非同期の録画スケジューラ
//!
//! クエリ発行は handle を返すだけで、結果は `subscribe()` で得られる
//! 共有イベントストリームに後から流れてきます。
//!
//! # 設計原則
//! - 1 つのストリームを全クエリで共有する（到着順は不定）
//! - 応答の対応付けは handle で行う（呼び出し側の責務）
//! - 購読は発行より先に行うこと（発行中に応答が流れることがある）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::domain::{RequestHandle, SchedulerError, SchedulerEvent, TaskId, TaskKind};

/// Flags for an overlap-options query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapOptionFlags {
    /// Ask the scheduler to leave reminder tasks out of the option groups.
    pub exclude_reminders: bool,
}

impl Default for OverlapOptionFlags {
    fn default() -> Self {
        Self {
            exclude_reminders: true,
        }
    }
}

#[async_trait]
pub trait SchedulerService: Send + Sync {
    /// Subscribe to the shared event stream.
    fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent>;

    /// Answered with `SchedulerEvent::Overlap`.
    async fn query_overlaps_for_task(&self, task_id: TaskId)
    -> Result<RequestHandle, SchedulerError>;

    /// Answered with `SchedulerEvent::Options` carrying the kind table.
    async fn query_all_options_at_time(
        &self,
        at: DateTime<Utc>,
        exclude_ids: &[TaskId],
        exclude_kinds: &[TaskKind],
    ) -> Result<RequestHandle, SchedulerError>;

    /// Answered with `SchedulerEvent::Options`.
    async fn query_overlap_options_for_task(
        &self,
        task_id: TaskId,
        flags: OverlapOptionFlags,
    ) -> Result<RequestHandle, SchedulerError>;
}
