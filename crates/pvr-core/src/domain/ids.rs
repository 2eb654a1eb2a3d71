//! Domain identifiers (strongly-typed IDs).
//!
//! Task / Job / RequestHandle はすべて不透明な ID です。
//! `Id<T>` というジェネリック型で共通実装を提供しつつ、`T` は
//! PhantomData のマーカー型としてコンパイル時の型安全性だけを担います。
//!
//! ## ULID
//! - 本番の scheduler が払い出す ID をそのまま保持できる 128-bit 値
//! - 時刻でソート可能（`UlidGenerator` で生成した場合）
//! - テストや scripted scheduler では `Id::new(n)` で決定的に作れる

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"job-", "task-", "req-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// ```ignore
/// let task_id = TaskId::new(1);
/// let job_id = JobId::new(1);
/// // task_id と job_id は異なる型なので、混同できない
/// ```
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    /// u128 から決定的に Id を作成（テスト・scripted scheduler 用）
    pub fn new(value: u128) -> Self {
        Self::from_ulid(Ulid::from_bytes(value.to_be_bytes()))
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }

    pub fn as_u128(&self) -> u128 {
        u128::from_be_bytes(self.ulid.to_bytes())
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

// ========================================
// マーカー型の定義
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Job {}

impl IdMarker for Job {
    fn prefix() -> &'static str {
        "job-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn prefix() -> &'static str {
        "task-"
    }
}

/// Scheduler への 1 リクエストのマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Request {}

impl IdMarker for Request {
    fn prefix() -> &'static str {
        "req-"
    }
}

/// Identifier of a recurring recording definition.
pub type JobId = Id<Job>;

/// Identifier of a single schedulable unit.
pub type TaskId = Id<Task>;

/// Opaque correlation token returned when a scheduler query is issued.
pub type RequestHandle = Id<Request>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let job = JobId::new(7);
        let task = TaskId::new(7);
        let handle = RequestHandle::new(7);

        assert_eq!(job.as_u128(), 7);
        assert_eq!(task.as_u128(), 7);
        assert_eq!(handle.as_u128(), 7);

        assert!(job.to_string().starts_with("job-"));
        assert!(task.to_string().starts_with("task-"));
        assert!(handle.to_string().starts_with("req-"));
        // let _: JobId = task; // <- does not compile
    }

    #[test]
    fn ids_serialize_as_plain_ulid_strings() {
        let task_id = TaskId::new(42);
        let serialized = serde_json::to_string(&task_id).unwrap();
        assert_eq!(serialized, format!("\"{}\"", task_id.as_ulid()));

        let deserialized: TaskId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(task_id, deserialized);
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;
        assert_eq!(size_of::<TaskId>(), size_of::<Ulid>());
        assert_eq!(size_of::<RequestHandle>(), 16);
    }
}
