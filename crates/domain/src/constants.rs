//! Application constants
//!
//! Centralized location for domain-level defaults and fixed policies.

/// How long the orchestrator refuses new runs after an API failure
pub const COOLDOWN_SECS: u64 = 15 * 60;

// Sync defaults
pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;
pub const DEFAULT_SCHEDULE_INTERVAL_HOURS: u32 = 6;
pub const DEFAULT_MAX_REQUESTS_PER_BATCH: u32 = 10;
pub const DEFAULT_LOG_RETENTION_DAYS: u32 = 30;

/// The remote lookup endpoint accepts at most this many ids per request
pub const MAX_IDS_PER_METRICS_REQUEST: usize = 100;

// Remote rate limit defaults (user timeline endpoint, app auth)
pub const DEFAULT_RATE_LIMIT_ALLOWED: u32 = 900;
pub const DEFAULT_RATE_WINDOW_SECS: u64 = 15 * 60;

// Remote API defaults
pub const DEFAULT_API_BASE_URL: &str = "https://api.twitter.com/2";
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_API_MAX_ATTEMPTS: usize = 3;
pub const TIMELINE_PAGE_SIZE: u32 = 100;

// Database defaults
pub const DEFAULT_DB_PATH: &str = "daosync.db";
pub const DEFAULT_DB_POOL_SIZE: u32 = 4;

