//! Errors - エラー型と分類
//!
//! Coordinator は呼び出し元にエラーを返しません（fail-open）。
//! ここで定義する型は内部で失敗を分類し、ログに残すためのものです。
//!
//! # 分類
//! - `SchedulerFault`: scheduler がイベントに載せて返したエラー
//! - `SchedulerError`: クエリの発行そのものが失敗した
//! - `QueryFailure`: 1 往復（発行→応答待ち）の失敗理由

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::events::ResponseKind;

/// Transport-level error reported by the scheduler on an event.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct SchedulerFault {
    pub message: String,
}

impl SchedulerFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Issuing a query failed before any handle was returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("scheduler unavailable: {0}")]
    Unavailable(String),

    #[error("query rejected: {0}")]
    Rejected(String),
}

/// Why a single round trip produced no data.
#[derive(Debug, Error)]
pub enum QueryFailure {
    #[error("failed to issue query: {0}")]
    Issue(#[from] SchedulerError),

    #[error("scheduler reported fault: {0}")]
    Fault(SchedulerFault),

    #[error("no matching response within {0:?}")]
    TimedOut(Duration),

    #[error("scheduler event stream closed")]
    StreamClosed,

    #[error("no {0:?} query is awaiting a response")]
    NotAwaited(ResponseKind),
}
