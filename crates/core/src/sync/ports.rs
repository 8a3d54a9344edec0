//! Port interfaces for sync operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use daosync_domain::{
    ApiResult, EngagementMetrics, LogEntry, Post, PostMetrics, Result, SyncRunStats,
    TimelinePage, TrackedAccount,
};

/// Remote timeline API
///
/// Every call is one outbound request against the shared rate limit. Both
/// success and failure carry the server's rate-limit headers when it sent
/// them.
#[async_trait]
pub trait TimelineApi: Send + Sync {
    /// One page of the account's posts created at or after `since`
    ///
    /// `page_token` is the `next_token` of the previous page, `None` for the
    /// newest page.
    async fn list_timeline(
        &self,
        account: &TrackedAccount,
        since: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> ApiResult<TimelinePage>;

    /// Look up current engagement metrics for a set of post ids
    async fn fetch_metrics(&self, ids: &[String]) -> ApiResult<Vec<PostMetrics>>;
}

/// Trait for storing discovered posts
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Get a post by id
    async fn find_post(&self, id: &str) -> Result<Option<Post>>;

    /// Insert a newly discovered post
    ///
    /// Idempotent: returns `false` when a post with the same id already
    /// exists, leaving it untouched.
    async fn insert_post(&self, post: &Post) -> Result<bool>;

    /// Overwrite a post's metrics and last-synced timestamp
    async fn update_post_metrics(
        &self,
        id: &str,
        metrics: &EngagementMetrics,
        synced_at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Trait for reading the tracked account list
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// All tracked accounts in a stable order
    async fn list_tracked_accounts(&self) -> Result<Vec<TrackedAccount>>;
}

/// Trait for persisting sync log entries and run statistics
#[async_trait]
pub trait SyncLogRepository: Send + Sync {
    /// Append one log entry
    async fn append_entry(&self, entry: &LogEntry) -> Result<()>;

    /// The `limit` most recent entries, newest first
    async fn recent_entries(&self, limit: usize) -> Result<Vec<LogEntry>>;

    /// Persist the statistics of a completed run
    async fn insert_run_stats(&self, stats: &SyncRunStats) -> Result<()>;

    /// Runs whose start time falls in `[start, end]`, oldest first
    async fn run_stats_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SyncRunStats>>;

    /// Delete entries and run statistics older than `cutoff`
    ///
    /// Returns the number of rows removed.
    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}
