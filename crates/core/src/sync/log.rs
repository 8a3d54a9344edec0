//! Operator-facing sync log
//!
//! [`SyncLog`] records what each run did through a [`SyncLogRepository`] and
//! mirrors every entry to `tracing`. Appending never fails the caller: if the
//! store rejects an entry, the failure goes to the process log and the run
//! carries on.

use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use daosync_common::time::{Clock, SharedClock};
use daosync_domain::{AggregatedRunStats, LogEntry, LogLevel, Result, SyncRunStats};
use tracing::{debug, error, info, warn};

use super::ports::SyncLogRepository;

/// Append-only record of sync events and per-run statistics
#[derive(Clone)]
pub struct SyncLog {
    repository: Arc<dyn SyncLogRepository>,
    clock: SharedClock,
}

impl SyncLog {
    pub fn new(repository: Arc<dyn SyncLogRepository>, clock: SharedClock) -> Self {
        Self { repository, clock }
    }

    /// Record one entry stamped with the current time
    pub async fn append(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        context: Option<serde_json::Value>,
    ) {
        let entry = LogEntry { timestamp: self.clock.now(), level, message: message.into(), context };
        mirror_to_tracing(&entry);

        if let Err(err) = self.repository.append_entry(&entry).await {
            error!(error = %err, message = %entry.message, "Failed to persist sync log entry");
        }
    }

    pub async fn info(&self, message: impl Into<String>) {
        self.append(LogLevel::Info, message, None).await;
    }

    pub async fn warn(&self, message: impl Into<String>) {
        self.append(LogLevel::Warn, message, None).await;
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.append(LogLevel::Error, message, None).await;
    }

    /// The last `limit` entries, newest first
    pub async fn recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.repository.recent_entries(limit).await
    }

    /// Persist the statistics of a completed run
    pub async fn record_run_stats(&self, stats: &SyncRunStats) -> Result<()> {
        self.repository.insert_run_stats(stats).await
    }

    /// Roll up every run that started within the last `window_days` days
    ///
    /// Returns `None` when no run falls in the window.
    pub async fn aggregate(&self, window_days: u32) -> Result<Option<AggregatedRunStats>> {
        let end = self.clock.now();
        let start = end - ChronoDuration::days(i64::from(window_days));
        let runs = self.repository.run_stats_between(start, end).await?;

        Ok(AggregatedRunStats::from_runs(&runs))
    }

    /// Delete entries and run statistics older than `retention_days`
    pub async fn prune(&self, retention_days: u32) -> Result<u64> {
        let cutoff = self.clock.now() - ChronoDuration::days(i64::from(retention_days));
        let removed = self.repository.delete_before(cutoff).await?;
        if removed > 0 {
            debug!(removed, %cutoff, "Pruned sync log");
        }
        Ok(removed)
    }
}

fn mirror_to_tracing(entry: &LogEntry) {
    let context = entry.context.as_ref().map(ToString::to_string);
    match entry.level {
        LogLevel::Debug => debug!(target: "daosync::sync_log", context, "{}", entry.message),
        LogLevel::Info => info!(target: "daosync::sync_log", context, "{}", entry.message),
        LogLevel::Warn => warn!(target: "daosync::sync_log", context, "{}", entry.message),
        LogLevel::Error => error!(target: "daosync::sync_log", context, "{}", entry.message),
    }
}
