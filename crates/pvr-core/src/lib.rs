//! pvr-core
//!
//! Recording-conflict detection for a set-top-box recorder.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, job, events, conflict, errors）
//! - **ports**: 抽象化レイヤー（TaskRepository, SchedulerService, Clock, IdGenerator）
//! - **conflict**: 競合検出の部品（RequestCorrelator, reminder filter, ConflictAccumulator）
//! - **app**: 公開ファサード（ConflictCoordinator, CoordinatorBuilder）
//! - **impls**: 実装（InMemoryTaskRepository, ScriptedScheduler など開発用）
//! - **config**: CoordinatorConfig

pub mod app;
pub mod config;
pub mod conflict;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{BuildError, ConflictCoordinator, ConflictQuery, CoordinatorBuilder};
pub use config::{ConfigError, CoordinatorConfig};
