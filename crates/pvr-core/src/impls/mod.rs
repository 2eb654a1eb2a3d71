//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryTaskRepository**: 開発用のタスクリポジトリ
//! - **ScriptedScheduler**: 応答を台本で指定できるスケジューラ
//!
//! 本番の scheduler / repository はミドルウェア側が提供します。

pub mod inmem_repository;
pub mod scripted_scheduler;

pub use self::inmem_repository::InMemoryTaskRepository;
pub use self::scripted_scheduler::{SchedulerCall, Script, ScriptedScheduler, TimeOptions};
