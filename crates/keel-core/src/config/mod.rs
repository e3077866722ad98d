//! Configuration types for Keel.
//!
//! Two documents are loaded from YAML:
//!
//! - **Engine configuration** ([`EngineConfig`]): worker-pool size, conflict
//!   retry budget and throttling backoff.
//! - **Policy files** ([`PolicyFile`]): named policies, each binding a resource
//!   kind to an ordered filter list and an ordered action list.

pub mod policy;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub use policy::{
    ActionDefinition, ComparisonOp, FilterDefinition, OriginProtocolPolicy, PolicyDefinition,
    PolicyFile, SslProtocol, ValuesFormat, ValuesFrom, ViewerProtocolPolicy,
};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Invalid(String),
}

/// Engine tuning shared by every policy run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of resources mutated concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Maximum fetch-then-write cycles per resource when writes hit a
    /// version conflict.
    #[serde(default = "default_conflict_attempts")]
    pub conflict_attempts: u32,

    /// Backoff for throttled remote calls.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            conflict_attempts: default_conflict_attempts(),
            retry: RetryConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.conflict_attempts == 0 {
            return Err(ConfigError::Invalid(
                "conflict_attempts must be at least 1".to_string(),
            ));
        }
        self.retry.validate()
    }
}

/// Exponential backoff for throttled calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Error codes treated as throttling.
    #[serde(default = "default_retryable_codes")]
    pub retryable_codes: Vec<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            backoff_factor: default_backoff_factor(),
            max_delay_ms: default_max_delay_ms(),
            retryable_codes: default_retryable_codes(),
        }
    }
}

impl RetryConfig {
    /// A configuration that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after the given zero-based attempt failed.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.powi(attempt as i32);
        let millis = (self.base_delay_ms as f64 * factor).min(self.max_delay_ms as f64);
        Duration::from_millis(millis as u64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.backoff_factor.is_nan() || self.backoff_factor < 1.0 {
            return Err(ConfigError::Invalid(
                "retry.backoff_factor must be >= 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_concurrency() -> usize {
    2
}

fn default_conflict_attempts() -> u32 {
    3
}

fn default_max_attempts() -> u32 {
    8
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_retryable_codes() -> Vec<String> {
    [
        "Throttling",
        "ThrottlingException",
        "RequestLimitExceeded",
        "TooManyRequestsException",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
