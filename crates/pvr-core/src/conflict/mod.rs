//! Conflict - 競合検出のアルゴリズム部品
//!
//! Coordinator（`app::coordinator`）がこれらを組み合わせて使います。
//!
//! # 構成
//! - **correlator**: handle による応答の対応付け（呼び出し単位）
//! - **reminder_filter**: リマインダーだけの差による組み合わせを除外
//! - **accumulator**: 候補タスクの逐次ファンアウトと重複排除

pub mod accumulator;
pub mod correlator;
pub mod reminder_filter;

pub use self::accumulator::{AccumulatorState, ConflictAccumulator, Progress};
pub use self::correlator::{Acceptance, RequestCorrelator};
pub use self::reminder_filter::{filter_reminder_groups, indicates_conflict, kind_index};
