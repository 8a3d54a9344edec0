//! In-memory fakes for every sync port
//!
//! Each fake records what the orchestrator asked of it so tests can assert on
//! request counts and stored state without a database or network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use daosync_core::sync::ports::{AccountRepository, PostRepository, SyncLogRepository, TimelineApi};
use daosync_domain::{
    ApiFailure, ApiResponse, ApiResult, DaoSyncError, EngagementMetrics, LogEntry, Post,
    PostMetrics, RateLimitInfo, Result as DomainResult, SyncRunStats, TimelineItem, TimelinePage,
    TrackedAccount,
};
use parking_lot::Mutex;
use tokio::sync::Notify;

/* -------------------------------------------------------------------------- */
/* Timeline API */
/* -------------------------------------------------------------------------- */

/// Pauses a timeline call until the test releases it.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

/// Scripted timeline API.
///
/// Timelines are keyed by platform user id; metrics by post id. An account
/// with no scripted timeline returns an empty listing. Listings come back as a
/// single page unless a page size is set.
#[derive(Default)]
pub struct FakeTimeline {
    timelines: Mutex<HashMap<String, Result<Vec<TimelineItem>, ApiFailure>>>,
    metrics: Mutex<HashMap<String, EngagementMetrics>>,
    stray_metrics: Mutex<Vec<PostMetrics>>,
    timeline_rate_limit: Mutex<Option<RateLimitInfo>>,
    metrics_rate_limit: Mutex<Option<RateLimitInfo>>,
    page_size: Mutex<Option<usize>>,
    gate: Mutex<Option<Arc<Gate>>>,
    timeline_calls: AtomicUsize,
    page_tokens: Mutex<Vec<Option<String>>>,
    metrics_requests: Mutex<Vec<Vec<String>>>,
}

impl FakeTimeline {
    pub fn set_timeline(&self, platform_user_id: &str, items: Vec<TimelineItem>) {
        self.timelines.lock().insert(platform_user_id.to_string(), Ok(items));
    }

    pub fn fail_timeline(&self, platform_user_id: &str, error: DaoSyncError) {
        self.timelines.lock().insert(platform_user_id.to_string(), Err(error.into()));
    }

    /// Fail the listing with an error response that still reports rate limits
    pub fn fail_timeline_with_rate_limit(
        &self,
        platform_user_id: &str,
        error: DaoSyncError,
        info: RateLimitInfo,
    ) {
        self.timelines
            .lock()
            .insert(platform_user_id.to_string(), Err(ApiFailure::new(error, Some(info))));
    }

    pub fn set_metrics(&self, post_id: &str, metrics: EngagementMetrics) {
        self.metrics.lock().insert(post_id.to_string(), metrics);
    }

    /// Append `row` to every metrics response, whatever was requested
    pub fn add_stray_metrics(&self, row: PostMetrics) {
        self.stray_metrics.lock().push(row);
    }

    /// Attach rate-limit headers to every timeline response
    pub fn report_rate_limit(&self, info: RateLimitInfo) {
        *self.timeline_rate_limit.lock() = Some(info);
    }

    /// Attach rate-limit headers to every metrics response
    pub fn report_metrics_rate_limit(&self, info: RateLimitInfo) {
        *self.metrics_rate_limit.lock() = Some(info);
    }

    /// Split listings into pages of `size` items linked by `page-N` tokens
    pub fn paginate(&self, size: usize) {
        *self.page_size.lock() = Some(size.max(1));
    }

    /// Block the next timeline calls on `gate`
    pub fn install_gate(&self, gate: Arc<Gate>) {
        *self.gate.lock() = Some(gate);
    }

    pub fn timeline_calls(&self) -> usize {
        self.timeline_calls.load(Ordering::SeqCst)
    }

    /// Page token of every listing call, in call order
    pub fn page_tokens(&self) -> Vec<Option<String>> {
        self.page_tokens.lock().clone()
    }

    pub fn metrics_requests(&self) -> Vec<Vec<String>> {
        self.metrics_requests.lock().clone()
    }
}

#[async_trait]
impl TimelineApi for FakeTimeline {
    async fn list_timeline(
        &self,
        account: &TrackedAccount,
        since: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> ApiResult<TimelinePage> {
        self.timeline_calls.fetch_add(1, Ordering::SeqCst);
        self.page_tokens.lock().push(page_token.map(str::to_string));

        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let scripted = self.timelines.lock().get(&account.platform_user_id).cloned();
        let items = scripted.unwrap_or_else(|| Ok(Vec::new()))?;
        let items: Vec<_> = items.into_iter().filter(|item| item.created_at >= since).collect();
        let rate_limit = *self.timeline_rate_limit.lock();

        let Some(page_size) = *self.page_size.lock() else {
            return Ok(ApiResponse::new(TimelinePage::last(items), rate_limit));
        };

        let page = page_token
            .and_then(|token| token.strip_prefix("page-"))
            .and_then(|number| number.parse::<usize>().ok())
            .unwrap_or(0);
        let start = page * page_size;
        let end = (start + page_size).min(items.len());
        let page_items = items.get(start..end).map(<[_]>::to_vec).unwrap_or_default();
        let next_token = (end < items.len()).then(|| format!("page-{}", page + 1));

        Ok(ApiResponse::new(TimelinePage { items: page_items, next_token }, rate_limit))
    }

    async fn fetch_metrics(&self, ids: &[String]) -> ApiResult<Vec<PostMetrics>> {
        self.metrics_requests.lock().push(ids.to_vec());

        let metrics = self.metrics.lock();
        let mut data: Vec<PostMetrics> = ids
            .iter()
            .filter_map(|id| {
                metrics.get(id).map(|metrics| PostMetrics { id: id.clone(), metrics: *metrics })
            })
            .collect();
        data.extend(self.stray_metrics.lock().iter().cloned());

        Ok(ApiResponse::new(data, *self.metrics_rate_limit.lock()))
    }
}

/* -------------------------------------------------------------------------- */
/* Stores */
/* -------------------------------------------------------------------------- */

#[derive(Default)]
pub struct InMemoryPosts {
    posts: Mutex<HashMap<String, Post>>,
    fail_inserts: AtomicBool,
}

impl InMemoryPosts {
    pub fn seed(&self, post: Post) {
        self.posts.lock().insert(post.id.clone(), post);
    }

    pub fn get(&self, id: &str) -> Option<Post> {
        self.posts.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.posts.lock().len()
    }

    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PostRepository for InMemoryPosts {
    async fn find_post(&self, id: &str) -> DomainResult<Option<Post>> {
        Ok(self.get(id))
    }

    async fn insert_post(&self, post: &Post) -> DomainResult<bool> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(DaoSyncError::Database("disk I/O error".into()));
        }

        let mut posts = self.posts.lock();
        if posts.contains_key(&post.id) {
            return Ok(false);
        }
        posts.insert(post.id.clone(), post.clone());
        Ok(true)
    }

    async fn update_post_metrics(
        &self,
        id: &str,
        metrics: &EngagementMetrics,
        synced_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let mut posts = self.posts.lock();
        let post =
            posts.get_mut(id).ok_or_else(|| DaoSyncError::NotFound(format!("post {id}")))?;
        post.metrics = *metrics;
        post.last_synced_at = synced_at;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAccounts {
    accounts: Mutex<Vec<TrackedAccount>>,
    failure: Mutex<Option<DaoSyncError>>,
}

impl InMemoryAccounts {
    pub fn new(accounts: Vec<TrackedAccount>) -> Self {
        Self { accounts: Mutex::new(accounts), failure: Mutex::new(None) }
    }

    pub fn fail_with(&self, error: DaoSyncError) {
        *self.failure.lock() = Some(error);
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccounts {
    async fn list_tracked_accounts(&self) -> DomainResult<Vec<TrackedAccount>> {
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }
        Ok(self.accounts.lock().clone())
    }
}

#[derive(Default)]
pub struct InMemorySyncLog {
    entries: Mutex<Vec<LogEntry>>,
    runs: Mutex<Vec<SyncRunStats>>,
    fail_appends: AtomicBool,
}

impl InMemorySyncLog {
    /// Entries in insertion order
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub fn runs(&self) -> Vec<SyncRunStats> {
        self.runs.lock().clone()
    }

    pub fn fail_appends(&self) {
        self.fail_appends.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SyncLogRepository for InMemorySyncLog {
    async fn append_entry(&self, entry: &LogEntry) -> DomainResult<()> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(DaoSyncError::Database("database is locked".into()));
        }
        self.entries.lock().push(entry.clone());
        Ok(())
    }

    async fn recent_entries(&self, limit: usize) -> DomainResult<Vec<LogEntry>> {
        Ok(self.entries.lock().iter().rev().take(limit).cloned().collect())
    }

    async fn insert_run_stats(&self, stats: &SyncRunStats) -> DomainResult<()> {
        self.runs.lock().push(stats.clone());
        Ok(())
    }

    async fn run_stats_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<SyncRunStats>> {
        Ok(self
            .runs
            .lock()
            .iter()
            .filter(|run| run.started_at >= start && run.started_at <= end)
            .cloned()
            .collect())
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> DomainResult<u64> {
        let mut entries = self.entries.lock();
        let mut runs = self.runs.lock();
        let before = entries.len() + runs.len();

        entries.retain(|entry| entry.timestamp >= cutoff);
        runs.retain(|run| run.started_at >= cutoff);

        Ok((before - entries.len() - runs.len()) as u64)
    }
}
