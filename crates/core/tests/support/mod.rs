//! Shared test helpers for `daosync-core` integration tests.
//!
//! These helpers wire an orchestrator to in-memory fakes driven by a
//! `MockClock`, so tests can focus on behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod fakes;

use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use daosync_common::time::{Clock, MockClock, SharedClock};
use daosync_core::sync::{SyncOrchestrator, SyncPorts};
use daosync_domain::{EngagementMetrics, Post, SyncConfig, TimelineItem, TrackedAccount};

use self::fakes::{FakeTimeline, InMemoryAccounts, InMemoryPosts, InMemorySyncLog};

/// Fixed start instant for every test clock (2023-11-14T22:13:20Z)
pub const START_TS: i64 = 1_700_000_000;

pub fn account(id: &str, handle: &str) -> TrackedAccount {
    TrackedAccount {
        id: id.to_string(),
        name: format!("{handle} DAO"),
        handle: handle.to_string(),
        platform_user_id: format!("uid-{id}"),
    }
}

pub fn metrics(likes: u64) -> EngagementMetrics {
    EngagementMetrics { likes, reposts: likes / 2, replies: 1, quotes: 0 }
}

/// A fake orchestrator environment
pub struct Harness {
    pub clock: MockClock,
    pub timeline: Arc<FakeTimeline>,
    pub posts: Arc<InMemoryPosts>,
    pub accounts: Arc<InMemoryAccounts>,
    pub sync_log: Arc<InMemorySyncLog>,
}

impl Harness {
    pub fn new(accounts: Vec<TrackedAccount>) -> Self {
        Self {
            clock: MockClock::from_timestamp(START_TS),
            timeline: Arc::new(FakeTimeline::default()),
            posts: Arc::new(InMemoryPosts::default()),
            accounts: Arc::new(InMemoryAccounts::new(accounts)),
            sync_log: Arc::new(InMemorySyncLog::default()),
        }
    }

    pub fn ports(&self) -> SyncPorts {
        SyncPorts {
            timeline: self.timeline.clone(),
            posts: self.posts.clone(),
            accounts: self.accounts.clone(),
            sync_log: self.sync_log.clone(),
        }
    }

    pub fn shared_clock(&self) -> SharedClock {
        Arc::new(self.clock.clone())
    }

    pub fn orchestrator(&self, config: SyncConfig) -> Arc<SyncOrchestrator> {
        Arc::new(SyncOrchestrator::new(config, self.ports(), self.shared_clock()).unwrap())
    }

    /// A timeline item created `age_hours` before the current mock time
    pub fn item(&self, id: &str, age_hours: i64, likes: u64) -> TimelineItem {
        TimelineItem {
            id: id.to_string(),
            created_at: self.clock.now() - ChronoDuration::hours(age_hours),
            text: format!("post {id}"),
            metrics: metrics(likes),
        }
    }

    /// Store `item` as an already-known post of `account`
    pub fn seed_known(&self, account: &TrackedAccount, item: &TimelineItem) {
        let synced_at = self.clock.now() - ChronoDuration::days(1);
        self.posts.seed(Post::discovered(&account.id, item, synced_at));
    }
}

/// Sync config with a generous rate allowance and no log pruning
pub fn config() -> SyncConfig {
    SyncConfig { rate_limit_allowed: 900, log_retention_days: None, ..SyncConfig::default() }
}
