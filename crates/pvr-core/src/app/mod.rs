//! App - アプリケーション層
//!
//! このモジュールは、ports と conflict の部品を組み合わせて
//! 公開 API を実装します。
//!
//! # 主要コンポーネント
//! - **CoordinatorBuilder**: Coordinator の構築とワイヤリング
//! - **ConflictCoordinator**: 5 つの競合検出操作の公開ファサード

pub mod builder;
pub mod coordinator;

pub use self::builder::{BuildError, CoordinatorBuilder};
pub use self::coordinator::{ConflictCoordinator, ConflictQuery};
