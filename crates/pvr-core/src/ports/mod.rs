//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（録画スケジューラ、タスクリポジトリ）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - Coordinator は読み取り専用（スケジュールを変更しない）
//! - Scheduler は非同期・イベント駆動（handle で応答を対応付ける）

pub mod clock;
pub mod id_generator;
pub mod scheduler;
pub mod task_repository;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, SequentialGenerator, UlidGenerator};
pub use self::scheduler::{OverlapOptionFlags, SchedulerService};
pub use self::task_repository::TaskRepository;
