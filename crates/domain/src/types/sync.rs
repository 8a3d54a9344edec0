//! Sync run bookkeeping: log entries, run statistics and cooldown state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

/* -------------------------------------------------------------------------- */
/* Sync Log */
/* -------------------------------------------------------------------------- */

/// Severity of a sync log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl_domain_status_conversions!(LogLevel {
    Debug => "debug",
    Info => "info",
    Warn => "warn",
    Error => "error",
});

/// One append-only sync log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

/* -------------------------------------------------------------------------- */
/* Run Statistics */
/* -------------------------------------------------------------------------- */

/// Outcome of one sync run
///
/// `errors` and `warnings` keep the order in which accounts were visited.
/// Rate-budget denials are warnings; only API and store failures are errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRunStats {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub accounts_processed: u32,
    pub posts_updated: u32,
    pub posts_added: u32,
    pub api_requests: u32,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl SyncRunStats {
    /// Empty stats for a run starting at `started_at`
    pub fn started(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            duration_ms: 0,
            accounts_processed: 0,
            posts_updated: 0,
            posts_added: 0,
            api_requests: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn posts_processed(&self) -> u32 {
        self.posts_added + self.posts_updated
    }
}

/// Rollup of every run that started inside a time window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRunStats {
    pub runs: u32,
    /// Posts added plus posts updated
    pub posts_processed: u64,
    pub api_requests: u64,
    pub errors: u64,
    pub average_duration_ms: f64,
}

impl AggregatedRunStats {
    /// Fold a set of runs; `None` when the set is empty
    pub fn from_runs<'a>(runs: impl IntoIterator<Item = &'a SyncRunStats>) -> Option<Self> {
        let mut count = 0u32;
        let mut posts_processed = 0u64;
        let mut api_requests = 0u64;
        let mut errors = 0u64;
        let mut total_duration_ms = 0u64;

        for run in runs {
            count += 1;
            posts_processed += u64::from(run.posts_processed());
            api_requests += u64::from(run.api_requests);
            errors += run.errors.len() as u64;
            total_duration_ms = total_duration_ms.saturating_add(run.duration_ms);
        }

        if count == 0 {
            return None;
        }

        Some(Self {
            runs: count,
            posts_processed,
            api_requests,
            errors,
            average_duration_ms: total_duration_ms as f64 / f64::from(count),
        })
    }
}

/* -------------------------------------------------------------------------- */
/* Orchestrator State */
/* -------------------------------------------------------------------------- */

/// Coarse orchestrator state reported to operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Running,
    CoolingDown,
}

impl_domain_status_conversions!(SyncState {
    Idle => "idle",
    Running => "running",
    CoolingDown => "cooling_down",
});

/// Active cooldown after an API failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownState {
    pub until: DateTime<Utc>,
    /// First API error of the run that triggered the cooldown
    pub trigger: String,
}

impl CooldownState {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.until
    }
}
