//! Coordinator configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::TaskKind;
use crate::ports::OverlapOptionFlags;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for `ConflictCoordinator`.
///
/// Missing fields in a config file fall back to `default_v1()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// How long one scheduler round trip may take before it resolves as "no data".
    pub query_timeout_ms: u64,

    /// Task kinds excluded from all-options-at-time queries.
    pub time_query_excluded_kinds: Vec<TaskKind>,

    /// Flags sent with overlap-options queries.
    pub overlap_option_flags: OverlapOptionFlags,
}

impl CoordinatorConfig {
    pub fn default_v1() -> Self {
        Self {
            query_timeout_ms: 5_000,
            time_query_excluded_kinds: Vec::new(),
            overlap_option_flags: OverlapOptionFlags::default(),
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// Set the query timeout. Precision is one millisecond: a sub-millisecond
    /// remainder rounds up, and durations beyond `u64::MAX` ms saturate.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout_ms = u64::try_from(timeout.as_micros().div_ceil(1_000)).unwrap_or(u64::MAX);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "query_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json_str(path: &Path, raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(path, &raw)
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::default_v1()
    }
}
