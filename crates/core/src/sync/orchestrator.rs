//! Sync orchestrator
//!
//! Owns the sync lifecycle: single manual runs, an optional recurring
//! schedule, and the cooldown entered after API failures. Accounts are walked
//! sequentially; each one spends its own slice of the shared rate budget and a
//! failure on one account never aborts the others.
//!
//! ```text
//! Idle ──run_once──▶ Running ──ok──▶ Idle
//!                       │
//!                       └──API failure──▶ CoolingDown ──expires──▶ Idle
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use daosync_common::resilience::{RateBudget, RateBudgetConfig, RateUsage, Reservation};
use daosync_common::time::{duration_until, to_chrono, Clock, SharedClock};
use daosync_domain::constants::COOLDOWN_SECS;
use daosync_domain::{
    ApiResult, CooldownState, DaoSyncError, LogLevel, Post, RateLimitInfo, Result, SyncConfig,
    SyncRunStats, SyncState, TimelineItem, TrackedAccount,
};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use super::error::{ScheduleError, SyncControlError};
use super::log::SyncLog;
use super::ports::{AccountRepository, PostRepository, SyncLogRepository, TimelineApi};
use super::schedule::{self, ScheduleHandle};

/// Collaborators the orchestrator drives
#[derive(Clone)]
pub struct SyncPorts {
    pub timeline: Arc<dyn TimelineApi>,
    pub posts: Arc<dyn PostRepository>,
    pub accounts: Arc<dyn AccountRepository>,
    pub sync_log: Arc<dyn SyncLogRepository>,
}

/// Snapshot of orchestrator state for operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub state: SyncState,
    pub last_run: Option<SyncRunStats>,
    pub cooldown: Option<CooldownState>,
    pub schedule_enabled: bool,
    pub rate_usage: RateUsage,
}

#[derive(Debug, Default)]
struct ControlState {
    running: bool,
    cooldown: Option<CooldownState>,
    last_run: Option<SyncRunStats>,
}

impl ControlState {
    fn clear_expired_cooldown(&mut self, now: DateTime<Utc>) {
        if self.cooldown.as_ref().is_some_and(|cooldown| !cooldown.is_active_at(now)) {
            debug!("Sync cooldown expired");
            self.cooldown = None;
        }
    }
}

/// Releases the running flag when the run ends, even if the run future is
/// dropped part-way through.
struct RunGuard<'a> {
    state: &'a Mutex<ControlState>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().running = false;
    }
}

/// Why one account stopped early
enum AccountFailure {
    /// The remote API failed; counts towards the cooldown
    Api(DaoSyncError),
    /// The local store failed; recorded but no cooldown
    Store(DaoSyncError),
}

/// Sync orchestrator
pub struct SyncOrchestrator {
    config: SyncConfig,
    ports: SyncPorts,
    rate_budget: Arc<RateBudget<SharedClock>>,
    sync_log: SyncLog,
    clock: SharedClock,
    state: Mutex<ControlState>,
    schedule: Mutex<Option<ScheduleHandle>>,
}

impl SyncOrchestrator {
    /// Create an orchestrator with its own rate budget
    ///
    /// # Errors
    ///
    /// Returns `DaoSyncError::Config` if `config` fails validation.
    pub fn new(config: SyncConfig, ports: SyncPorts, clock: SharedClock) -> Result<Self> {
        config.validate()?;

        let budget_config =
            RateBudgetConfig { allowed: config.rate_limit_allowed, window: config.rate_window() };
        let rate_budget = RateBudget::with_clock(budget_config, Arc::clone(&clock))
            .map_err(|err| DaoSyncError::Config(err.to_string()))?;

        Ok(Self::with_rate_budget(config, ports, Arc::new(rate_budget), clock))
    }

    /// Create an orchestrator sharing an existing rate budget
    pub fn with_rate_budget(
        config: SyncConfig,
        ports: SyncPorts,
        rate_budget: Arc<RateBudget<SharedClock>>,
        clock: SharedClock,
    ) -> Self {
        let sync_log = SyncLog::new(Arc::clone(&ports.sync_log), Arc::clone(&clock));
        Self {
            config,
            ports,
            rate_budget,
            sync_log,
            clock,
            state: Mutex::new(ControlState::default()),
            schedule: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn sync_log(&self) -> &SyncLog {
        &self.sync_log
    }

    pub fn rate_budget(&self) -> &Arc<RateBudget<SharedClock>> {
        &self.rate_budget
    }

    /// Execute one sync run now
    ///
    /// # Errors
    ///
    /// - `AlreadyRunning` if another run (manual or scheduled) is in progress
    /// - `CoolingDown` if a previous run failed against the API less than
    ///   fifteen minutes ago
    ///
    /// Per-account failures never surface here; they are listed in the
    /// returned stats.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> std::result::Result<SyncRunStats, SyncControlError> {
        let _guard = self.begin_run()?;
        Ok(self.execute_run().await)
    }

    /// Start running syncs every `schedule_interval_hours`
    ///
    /// The first scheduled run happens one interval after this call.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyEnabled` if a schedule is active and `NoRuntime` when
    /// called outside a tokio runtime.
    pub fn start_schedule(self: &Arc<Self>) -> std::result::Result<(), ScheduleError> {
        let mut slot = self.schedule.lock();
        if slot.as_ref().is_some_and(ScheduleHandle::is_active) {
            return Err(ScheduleError::AlreadyEnabled);
        }

        let handle =
            schedule::spawn(Arc::downgrade(self), self.config.schedule_interval())?;
        *slot = Some(handle);

        info!(
            interval_hours = self.config.schedule_interval_hours,
            "Sync schedule enabled"
        );
        Ok(())
    }

    /// Stop future scheduled runs
    ///
    /// A run already in progress is not interrupted.
    ///
    /// # Errors
    ///
    /// Returns `NotEnabled` if no schedule is active.
    pub fn stop_schedule(&self) -> std::result::Result<(), ScheduleError> {
        let handle = self.schedule.lock().take().ok_or(ScheduleError::NotEnabled)?;
        let was_active = handle.is_active();
        handle.cancel();

        if !was_active {
            return Err(ScheduleError::NotEnabled);
        }

        info!("Sync schedule disabled");
        Ok(())
    }

    pub fn is_schedule_enabled(&self) -> bool {
        self.schedule.lock().as_ref().is_some_and(ScheduleHandle::is_active)
    }

    /// Current state, last run, cooldown, schedule flag and rate usage
    pub fn status(&self) -> SyncStatus {
        let now = self.clock.now();
        let (state, last_run, cooldown) = {
            let mut control = self.state.lock();
            control.clear_expired_cooldown(now);

            let state = if control.running {
                SyncState::Running
            } else if control.cooldown.is_some() {
                SyncState::CoolingDown
            } else {
                SyncState::Idle
            };
            (state, control.last_run.clone(), control.cooldown.clone())
        };

        SyncStatus {
            state,
            last_run,
            cooldown,
            schedule_enabled: self.is_schedule_enabled(),
            rate_usage: self.rate_budget.usage_snapshot(),
        }
    }

    fn begin_run(&self) -> std::result::Result<RunGuard<'_>, SyncControlError> {
        let now = self.clock.now();
        let mut control = self.state.lock();

        if control.running {
            return Err(SyncControlError::AlreadyRunning);
        }

        control.clear_expired_cooldown(now);
        if let Some(cooldown) = &control.cooldown {
            return Err(SyncControlError::CoolingDown {
                remaining: duration_until(now, cooldown.until),
                until: cooldown.until,
            });
        }

        control.running = true;
        Ok(RunGuard { state: &self.state })
    }

    async fn execute_run(&self) -> SyncRunStats {
        let started = Instant::now();
        let started_at = self.clock.now();
        let cutoff = started_at - self.config.lookback();
        let mut stats = SyncRunStats::started(started_at);
        let mut first_api_error: Option<String> = None;

        info!(%cutoff, "Sync run started");

        match self.ports.accounts.list_tracked_accounts().await {
            Ok(accounts) => {
                for account in &accounts {
                    stats.accounts_processed += 1;
                    match self.sync_account(account, cutoff, &mut stats).await {
                        Ok(()) => {}
                        Err(AccountFailure::Api(err)) => {
                            let message = format!("{}: {err}", account.handle);
                            warn!(account = %account.handle, error = %err, "Account sync failed against API");
                            self.sync_log.error(message.clone()).await;
                            first_api_error.get_or_insert_with(|| message.clone());
                            stats.errors.push(message);
                        }
                        Err(AccountFailure::Store(err)) => {
                            let message = format!("{}: {err}", account.handle);
                            error!(account = %account.handle, error = %err, "Account sync failed against store");
                            self.sync_log.error(message.clone()).await;
                            stats.errors.push(message);
                        }
                    }
                }
            }
            Err(err) => {
                let message = format!("failed to list tracked accounts: {err}");
                error!(error = %err, "Sync run aborted");
                self.sync_log.error(message.clone()).await;
                stats.errors.push(message);
            }
        }

        stats.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.finish_run(&stats, first_api_error);
        self.emit_stats(&stats).await;
        stats
    }

    /// Record the outcome under the state lock before the run guard drops
    fn finish_run(&self, stats: &SyncRunStats, first_api_error: Option<String>) {
        let mut control = self.state.lock();
        control.last_run = Some(stats.clone());

        if let Some(trigger) = first_api_error {
            let until = self.clock.now() + to_chrono(Duration::from_secs(COOLDOWN_SECS));
            warn!(%until, trigger = %trigger, "Entering sync cooldown");
            control.cooldown = Some(CooldownState { until, trigger });
        }
    }

    async fn emit_stats(&self, stats: &SyncRunStats) {
        if let Err(err) = self.sync_log.record_run_stats(stats).await {
            error!(error = %err, "Failed to persist sync run stats");
        }

        let summary = format!(
            "Sync run finished: {} accounts, {} added, {} updated, {} requests, {} errors, {} warnings",
            stats.accounts_processed,
            stats.posts_added,
            stats.posts_updated,
            stats.api_requests,
            stats.errors.len(),
            stats.warnings.len(),
        );
        self.sync_log.append(LogLevel::Info, summary, serde_json::to_value(stats).ok()).await;

        if let Some(retention_days) = self.config.log_retention_days {
            if let Err(err) = self.sync_log.prune(retention_days).await {
                warn!(error = %err, "Failed to prune sync log");
            }
        }
    }

    #[instrument(skip(self, account, stats), fields(account = %account.handle))]
    async fn sync_account(
        &self,
        account: &TrackedAccount,
        cutoff: DateTime<Utc>,
        stats: &mut SyncRunStats,
    ) -> std::result::Result<(), AccountFailure> {
        let mut known_ids = Vec::new();
        let mut added = 0u32;
        let mut page_token: Option<String> = None;

        loop {
            if let Reservation::Denied { retry_after } = self.rate_budget.reserve(1) {
                let action =
                    if page_token.is_none() { "skipping account" } else { "timeline paging stopped" };
                self.rate_denied(account, action, retry_after, stats).await;
                return Ok(());
            }

            stats.api_requests += 1;
            let page = self.settle(
                self.ports.timeline.list_timeline(account, cutoff, page_token.as_deref()).await,
            )?;

            for item in page.items.iter().filter(|item| item.created_at >= cutoff) {
                let existing =
                    self.ports.posts.find_post(&item.id).await.map_err(AccountFailure::Store)?;
                if existing.is_some() {
                    known_ids.push(item.id.clone());
                } else if self.insert_discovered(account, item).await? {
                    added += 1;
                    stats.posts_added += 1;
                }
            }

            match page.next_token {
                Some(next) if page_token.as_deref() != Some(next.as_str()) => {
                    page_token = Some(next);
                }
                Some(next) => {
                    warn!(token = %next, "Timeline repeated its page token; stopping");
                    break;
                }
                None => break,
            }
        }

        let updated = self.refresh_metrics(account, &known_ids, stats).await?;

        info!(added, updated, known = known_ids.len(), "Account synced");
        Ok(())
    }

    async fn insert_discovered(
        &self,
        account: &TrackedAccount,
        item: &TimelineItem,
    ) -> std::result::Result<bool, AccountFailure> {
        let post = Post::discovered(&account.id, item, self.clock.now());
        self.ports.posts.insert_post(&post).await.map_err(AccountFailure::Store)
    }

    /// Refresh metrics for known posts in id chunks, bounded per account
    ///
    /// Returns how many posts were updated. Only ids of the requested chunk
    /// are applied, each at most once.
    async fn refresh_metrics(
        &self,
        account: &TrackedAccount,
        known_ids: &[String],
        stats: &mut SyncRunStats,
    ) -> std::result::Result<u32, AccountFailure> {
        let max_requests = self.config.max_requests_per_batch as usize;
        let chunks: Vec<&[String]> =
            known_ids.chunks(self.config.metrics_ids_per_request).collect();
        if chunks.len() > max_requests {
            debug!(
                chunks = chunks.len(),
                max_requests,
                "Metrics refresh capped for this run"
            );
        }

        let mut updated = 0u32;
        for chunk in chunks.into_iter().take(max_requests) {
            if let Reservation::Denied { retry_after } = self.rate_budget.reserve(1) {
                self.rate_denied(account, "metrics refresh stopped", retry_after, stats).await;
                break;
            }

            stats.api_requests += 1;
            let fresh_metrics = self.settle(self.ports.timeline.fetch_metrics(chunk).await)?;

            let mut pending: HashSet<&str> = chunk.iter().map(String::as_str).collect();
            let synced_at = self.clock.now();
            for fresh in &fresh_metrics {
                if !pending.remove(fresh.id.as_str()) {
                    debug!(id = %fresh.id, "Ignoring metrics for a post outside the request");
                    continue;
                }
                self.ports
                    .posts
                    .update_post_metrics(&fresh.id, &fresh.metrics, synced_at)
                    .await
                    .map_err(AccountFailure::Store)?;
                updated += 1;
                stats.posts_updated += 1;
            }
        }

        Ok(updated)
    }

    async fn rate_denied(
        &self,
        account: &TrackedAccount,
        action: &str,
        retry_after: Duration,
        stats: &mut SyncRunStats,
    ) {
        let message = format!(
            "{}: rate limited, {action} (quota resets in {}s)",
            account.handle,
            retry_after.as_secs()
        );
        self.sync_log.warn(message.clone()).await;
        stats.warnings.push(message);
    }

    /// Feed the response's rate-limit headers to the budget, failed or not
    fn settle<T>(&self, result: ApiResult<T>) -> std::result::Result<T, AccountFailure> {
        match result {
            Ok(response) => {
                self.observe_rate_limit(response.rate_limit);
                Ok(response.data)
            }
            Err(failure) => {
                self.observe_rate_limit(failure.rate_limit);
                Err(AccountFailure::Api(failure.error))
            }
        }
    }

    fn observe_rate_limit(&self, rate_limit: Option<RateLimitInfo>) {
        if let Some(info) = rate_limit {
            self.rate_budget.record_window_from_response(info.limit, info.remaining, info.reset_at);
        }
    }
}

impl Drop for SyncOrchestrator {
    fn drop(&mut self) {
        if let Some(handle) = self.schedule.get_mut().take() {
            if handle.is_active() {
                warn!("SyncOrchestrator dropped with schedule enabled; cancelling");
            }
            handle.cancel();
        }
    }
}
