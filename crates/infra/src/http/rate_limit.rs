//! `x-rate-limit-*` response headers

use chrono::DateTime;
use daosync_domain::RateLimitInfo;
use reqwest::header::HeaderMap;

pub const RATE_LIMIT_LIMIT: &str = "x-rate-limit-limit";
pub const RATE_LIMIT_REMAINING: &str = "x-rate-limit-remaining";
/// Epoch seconds at which the window resets
pub const RATE_LIMIT_RESET: &str = "x-rate-limit-reset";

/// Read the server's rate-limit window from a response
///
/// All three headers must be present and numeric.
pub fn parse_rate_limit(headers: &HeaderMap) -> Option<RateLimitInfo> {
    let header = |name: &str| -> Option<i64> { headers.get(name)?.to_str().ok()?.trim().parse().ok() };

    let limit = u32::try_from(header(RATE_LIMIT_LIMIT)?).ok()?;
    let remaining = u32::try_from(header(RATE_LIMIT_REMAINING)?).ok()?;
    let reset_at = DateTime::from_timestamp(header(RATE_LIMIT_RESET)?, 0)?;

    Some(RateLimitInfo { limit, remaining, reset_at })
}
