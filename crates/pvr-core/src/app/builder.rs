//! CoordinatorBuilder - Coordinator の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 開発体験の改善（明確なエラーメッセージ）

use std::sync::Arc;

use crate::app::ConflictCoordinator;
use crate::config::{ConfigError, CoordinatorConfig};
use crate::ports::{SchedulerService, TaskRepository};

/// CoordinatorBuilder は ConflictCoordinator を構築
///
/// # 使用例
/// ```ignore
/// let coordinator = CoordinatorBuilder::new()
///     .repository(repository)
///     .scheduler(scheduler)
///     .config(CoordinatorConfig::from_json_file("pvr.json")?)
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - ポートが足りない・設定が不正なら build() 時に BuildError を返す
pub struct CoordinatorBuilder {
    repository: Option<Arc<dyn TaskRepository>>,
    scheduler: Option<Arc<dyn SchedulerService>>,
    config: CoordinatorConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing task repository. Call .repository(...) before build().")]
    MissingRepository,

    #[error("Missing scheduler service. Call .scheduler(...) before build().")]
    MissingScheduler,

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

impl CoordinatorBuilder {
    pub fn new() -> Self {
        Self {
            repository: None,
            scheduler: None,
            config: CoordinatorConfig::default_v1(),
        }
    }

    pub fn repository(mut self, repository: Arc<dyn TaskRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn SchedulerService>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<ConflictCoordinator, BuildError> {
        let repository = self.repository.ok_or(BuildError::MissingRepository)?;
        let scheduler = self.scheduler.ok_or(BuildError::MissingScheduler)?;
        self.config.validate()?;
        Ok(ConflictCoordinator::new(repository, scheduler, self.config))
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
