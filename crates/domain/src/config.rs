//! Configuration structures
//!
//! Loading lives in `daosync-infra`; this module only defines the shape,
//! the defaults and validation. Every section deserializes with defaults so
//! partial config files are accepted.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_API_MAX_ATTEMPTS, DEFAULT_API_TIMEOUT_SECS, DEFAULT_DB_PATH,
    DEFAULT_DB_POOL_SIZE, DEFAULT_LOG_RETENTION_DAYS, DEFAULT_LOOKBACK_DAYS,
    DEFAULT_MAX_REQUESTS_PER_BATCH, DEFAULT_RATE_LIMIT_ALLOWED, DEFAULT_RATE_WINDOW_SECS,
    DEFAULT_SCHEDULE_INTERVAL_HOURS, MAX_IDS_PER_METRICS_REQUEST,
};
use crate::errors::{DaoSyncError, Result};

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate every section
    ///
    /// # Errors
    /// Returns `DaoSyncError::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.database.validate()?;
        self.api.validate()?;
        self.sync.validate()
    }
}

/// SQLite database settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: DEFAULT_DB_PATH.to_string(), pool_size: DEFAULT_DB_POOL_SIZE }
    }
}

impl DatabaseConfig {
    fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(DaoSyncError::Config("database.path must not be empty".into()));
        }
        positive("database.pool_size", u64::from(self.pool_size))
    }
}

/// Remote timeline API settings
///
/// The bearer token is an opaque credential: it is redacted from `Debug`
/// output and never serialized back out.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub bearer_token: Option<String>,
    pub timeout_secs: u64,
    pub max_attempts: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            bearer_token: None,
            timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            max_attempts: DEFAULT_API_MAX_ATTEMPTS,
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(DaoSyncError::Config("api.base_url must not be empty".into()));
        }
        positive("api.timeout_secs", self.timeout_secs)?;
        positive("api.max_attempts", self.max_attempts as u64)
    }
}

/// Sync orchestration settings
///
/// Immutable for the lifetime of an orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// How far back to discover and refresh posts
    pub lookback_days: u32,
    /// Interval between scheduled runs
    pub schedule_interval_hours: u32,
    /// Cap on metrics-refresh requests per account per run
    pub max_requests_per_batch: u32,
    /// Post ids packed into one metrics-refresh request
    pub metrics_ids_per_request: usize,
    /// Requests allowed per rate window until the server reports otherwise
    pub rate_limit_allowed: u32,
    pub rate_window_secs: u64,
    /// Sync log entries and run stats older than this are pruned after each
    /// run; `None` keeps everything
    pub log_retention_days: Option<u32>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            schedule_interval_hours: DEFAULT_SCHEDULE_INTERVAL_HOURS,
            max_requests_per_batch: DEFAULT_MAX_REQUESTS_PER_BATCH,
            metrics_ids_per_request: MAX_IDS_PER_METRICS_REQUEST,
            rate_limit_allowed: DEFAULT_RATE_LIMIT_ALLOWED,
            rate_window_secs: DEFAULT_RATE_WINDOW_SECS,
            log_retention_days: Some(DEFAULT_LOG_RETENTION_DAYS),
        }
    }
}

impl SyncConfig {
    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.lookback_days))
    }

    pub fn schedule_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.schedule_interval_hours) * 3600)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }

    /// Validate the sync settings
    ///
    /// # Errors
    /// Returns `DaoSyncError::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        positive("sync.lookback_days", u64::from(self.lookback_days))?;
        positive("sync.schedule_interval_hours", u64::from(self.schedule_interval_hours))?;
        positive("sync.max_requests_per_batch", u64::from(self.max_requests_per_batch))?;
        positive("sync.metrics_ids_per_request", self.metrics_ids_per_request as u64)?;
        if self.metrics_ids_per_request > MAX_IDS_PER_METRICS_REQUEST {
            return Err(DaoSyncError::Config(format!(
                "sync.metrics_ids_per_request must be at most {MAX_IDS_PER_METRICS_REQUEST}"
            )));
        }
        positive("sync.rate_limit_allowed", u64::from(self.rate_limit_allowed))?;
        positive("sync.rate_window_secs", self.rate_window_secs)?;
        if self.log_retention_days == Some(0) {
            return Err(DaoSyncError::Config(
                "sync.log_retention_days must be greater than 0 when set".into(),
            ));
        }
        Ok(())
    }
}

/// Process logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

fn positive(field: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(DaoSyncError::Config(format!("{field} must be greater than 0")));
    }
    Ok(())
}
