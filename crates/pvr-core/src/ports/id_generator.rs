//! IdGenerator port - ID 生成の抽象化
//!
//! Scheduler 実装が request handle を払い出すときに使います。
//! テスト容易性のために trait として抽象化しています。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）
//! - **SequentialGenerator**: 1, 2, 3, ... の決定的な ID（テスト・デモ用）

use std::sync::atomic::{AtomicU64, Ordering};

use ulid::Ulid;

use crate::domain::ids::{JobId, RequestHandle, TaskId};
use crate::ports::Clock;

/// IdGenerator は scheduler 側で使う ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数タスクから使える）
pub trait IdGenerator: Send + Sync {
    fn generate_handle(&self) -> RequestHandle;

    fn generate_task_id(&self) -> TaskId;

    fn generate_job_id(&self) -> JobId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// テスト時に FixedClock を渡すと timestamp 部分が固定されます。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_handle(&self) -> RequestHandle {
        RequestHandle::from(self.next_ulid())
    }

    fn generate_task_id(&self) -> TaskId {
        TaskId::from(self.next_ulid())
    }

    fn generate_job_id(&self) -> JobId {
        JobId::from(self.next_ulid())
    }
}

/// 単調増加カウンタによる決定的な ID 生成器
///
/// 3 種類の ID は同じカウンタを共有します。
#[derive(Debug)]
pub struct SequentialGenerator {
    next: AtomicU64,
}

impl SequentialGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    fn next_value(&self) -> u128 {
        u128::from(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SequentialGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialGenerator {
    fn generate_handle(&self) -> RequestHandle {
        RequestHandle::new(self.next_value())
    }

    fn generate_task_id(&self) -> TaskId {
        TaskId::new(self.next_value())
    }

    fn generate_job_id(&self) -> JobId {
        JobId::new(self.next_value())
    }
}
