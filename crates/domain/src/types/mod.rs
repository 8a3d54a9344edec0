//! Domain types and models

pub mod post;
pub mod sync;

pub use post::{
    ApiResponse, EngagementMetrics, Post, PostMetrics, RateLimitInfo, TimelineItem,
    TimelinePage, TrackedAccount,
};
pub use sync::{AggregatedRunStats, CooldownState, LogEntry, LogLevel, SyncRunStats, SyncState};
