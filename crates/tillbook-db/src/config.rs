//! # Configuration
//!
//! Settings for the database file and the sale engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TILLBOOK_DB_PATH=/srv/shop/tillbook.db                             │
//! │     TILLBOOK_MAX_ATTEMPTS=5                                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tillbook/tillbook.toml (Linux)                           │
//! │     ~/Library/Application Support/com.tillbook.tillbook/ (macOS)       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/srv/shop/tillbook.db"
//! max_connections = 5
//!
//! [engine]
//! max_attempts = 3
//! retry_backoff_ms = 25
//! retry_max_backoff_ms = 500
//! ```

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const ENV_DB_PATH: &str = "TILLBOOK_DB_PATH";
pub const ENV_MAX_ATTEMPTS: &str = "TILLBOOK_MAX_ATTEMPTS";
pub const ENV_MAX_CONNECTIONS: &str = "TILLBOOK_MAX_CONNECTIONS";

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

// =============================================================================
// Engine Settings
// =============================================================================

/// Knobs for [`SaleEngine`](crate::engine::SaleEngine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How many times an operation runs before a retryable failure is
    /// reported as [`DbError::Conflict`](crate::DbError::Conflict).
    pub max_attempts: u32,

    /// First pause after a retryable failure. Doubles per attempt, with jitter.
    pub retry_backoff_ms: u64,

    /// Ceiling for a single pause.
    pub retry_max_backoff_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_attempts: 3,
            retry_backoff_ms: 25,
            retry_max_backoff_ms: 500,
        }
    }
}

impl EngineConfig {
    /// Defaults plus `TILLBOOK_MAX_ATTEMPTS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = EngineConfig::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Fresh exponential schedule for one engine operation.
    ///
    /// No elapsed-time limit: the attempt count in `max_attempts` is what
    /// ends the retries.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.retry_backoff_ms))
            .with_max_interval(Duration::from_millis(self.retry_max_backoff_ms))
            .with_multiplier(2.0)
            .with_max_elapsed_time(None)
            .build()
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(value) = lookup(ENV_MAX_ATTEMPTS) {
            self.max_attempts = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(ENV_MAX_ATTEMPTS.to_string()))?;
            debug!(max_attempts = self.max_attempts, "Overriding max attempts from environment");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue("engine.max_attempts".to_string()));
        }
        if self.retry_max_backoff_ms < self.retry_backoff_ms {
            return Err(ConfigError::InvalidValue("engine.retry_max_backoff_ms".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Database file. None means the platform data directory.
    pub path: Option<PathBuf>,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: 5,
        }
    }
}

impl DatabaseSettings {
    /// The configured path, or `tillbook.db` in the platform data directory,
    /// or `./tillbook.db` when no home directory can be found.
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .or_else(|| {
                directories::ProjectDirs::from("com", "tillbook", "tillbook")
                    .map(|dirs| dirs.data_dir().join("tillbook.db"))
            })
            .unwrap_or_else(|| PathBuf::from("tillbook.db"))
    }
}

// =============================================================================
// Top-Level Config
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TillbookConfig {
    pub database: DatabaseSettings,
    pub engine: EngineConfig,
}

impl TillbookConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`tillbook.toml`), if it exists
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = TillbookConfig::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(path) = lookup(ENV_DB_PATH) {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(value) = lookup(ENV_MAX_CONNECTIONS) {
            self.database.max_connections = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(ENV_MAX_CONNECTIONS.to_string()))?;
        }

        self.engine.apply_overrides(lookup)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue("database.max_connections".to_string()));
        }
        self.engine.validate()
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tillbook", "tillbook")
            .map(|dirs| dirs.config_dir().join("tillbook.toml"))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
