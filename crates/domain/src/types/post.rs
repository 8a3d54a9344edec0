//! Accounts, posts and the shapes returned by the remote timeline API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/* -------------------------------------------------------------------------- */
/* Reference Data */
/* -------------------------------------------------------------------------- */

/// An organizational account whose timeline is kept in sync
///
/// Owned by the data store; the sync engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedAccount {
    pub id: String,
    pub name: String,
    /// Public handle on the remote platform, used in operator messages
    pub handle: String,
    /// Remote user id the timeline is fetched by
    pub platform_user_id: String,
}

/* -------------------------------------------------------------------------- */
/* Posts */
/* -------------------------------------------------------------------------- */

/// Engagement counters as reported by the remote platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub likes: u64,
    pub reposts: u64,
    pub replies: u64,
    pub quotes: u64,
}

/// A stored post
///
/// Created when first discovered. Only `metrics` and `last_synced_at` change
/// afterwards; posts are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub account_id: String,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub metrics: EngagementMetrics,
    pub last_synced_at: DateTime<Utc>,
}

impl Post {
    /// Build a new post from a freshly discovered timeline item
    pub fn discovered(account_id: &str, item: &TimelineItem, synced_at: DateTime<Utc>) -> Self {
        Self {
            id: item.id.clone(),
            account_id: account_id.to_string(),
            created_at: item.created_at,
            text: item.text.clone(),
            metrics: item.metrics,
            last_synced_at: synced_at,
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Remote API Shapes */
/* -------------------------------------------------------------------------- */

/// A post as returned by a timeline listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineItem {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub metrics: EngagementMetrics,
}

/// One page of a timeline listing, newest posts first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelinePage {
    pub items: Vec<TimelineItem>,
    /// Cursor for the next, older page; `None` on the last one
    pub next_token: Option<String>,
}

impl TimelinePage {
    pub fn last(items: Vec<TimelineItem>) -> Self {
        Self { items, next_token: None }
    }
}

/// Fresh metrics for one post from a metrics lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMetrics {
    pub id: String,
    pub metrics: EngagementMetrics,
}

/// Rate-limit state reported by the server alongside a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

/// A decoded API payload plus the rate-limit headers that came with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse<T> {
    pub data: T,
    pub rate_limit: Option<RateLimitInfo>,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T, rate_limit: Option<RateLimitInfo>) -> Self {
        Self { data, rate_limit }
    }

    /// Response without rate-limit information
    pub fn bare(data: T) -> Self {
        Self { data, rate_limit: None }
    }
}
