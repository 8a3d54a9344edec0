//! Request budget tracking against a remote rate-limit window
//!
//! [`RateBudget`] keeps an optimistic local count of requests spent in the
//! current window and reconciles it against the limits reported by the
//! remote API. The remote API is the source of truth for its own limits, so
//! [`RateBudget::record_window_from_response`] always overwrites local state.
//!
//! The tracker never sleeps: a denied reservation reports how long until the
//! window resets and the caller decides what to do.
//!
//! # Examples
//!
//! ```rust
//! use std::time::Duration;
//!
//! use daosync_common::resilience::{RateBudget, RateBudgetConfig, Reservation};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let budget = RateBudget::new(RateBudgetConfig {
//!     allowed: 2,
//!     window: Duration::from_secs(900),
//! })?;
//!
//! assert!(budget.reserve(2).is_granted());
//! match budget.reserve(1) {
//!     Reservation::Denied { retry_after } => assert!(retry_after <= Duration::from_secs(900)),
//!     Reservation::Granted { .. } => unreachable!("window exhausted"),
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::ConfigError;
use crate::time::{duration_until, to_chrono, Clock, SystemClock};

/// Configuration for a rate budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateBudgetConfig {
    /// Requests allowed per window until the server reports otherwise
    pub allowed: u32,
    /// Length of one rate-limit window
    pub window: Duration,
}

impl Default for RateBudgetConfig {
    fn default() -> Self {
        Self { allowed: 900, window: Duration::from_secs(15 * 60) }
    }
}

impl RateBudgetConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allowed == 0 {
            return Err(ConfigError::invalid("allowed must be greater than 0"));
        }
        if self.window.is_zero() {
            return Err(ConfigError::invalid("window must be greater than zero"));
        }
        Ok(())
    }
}

/// One rate-limit window
///
/// Invariant: `consumed <= allowed` for every reservation granted locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateWindow {
    pub started_at: DateTime<Utc>,
    pub length: Duration,
    pub consumed: u32,
    pub allowed: u32,
}

impl RateWindow {
    /// Instant at which this window resets
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.started_at + to_chrono(self.length)
    }

    fn remaining(&self) -> u32 {
        self.allowed.saturating_sub(self.consumed)
    }
}

/// Outcome of a reservation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// Quota was available and has been spent
    Granted { remaining: u32 },
    /// Quota is exhausted until the window resets
    Denied { retry_after: Duration },
}

impl Reservation {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

/// Point-in-time view of the budget, for observability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateUsage {
    pub consumed: u32,
    pub allowed: u32,
    pub resets_in: Duration,
    pub window_ends_at: DateTime<Utc>,
}

/// Rate budget tracker for a single API scope
pub struct RateBudget<C: Clock = SystemClock> {
    config: RateBudgetConfig,
    window: Mutex<RateWindow>,
    clock: C,
}

impl<C: Clock> RateBudget<C> {
    /// Create a new rate budget with a custom clock
    pub fn with_clock(config: RateBudgetConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;

        let window = RateWindow {
            started_at: clock.now(),
            length: config.window,
            consumed: 0,
            allowed: config.allowed,
        };

        Ok(Self { config, window: Mutex::new(window), clock })
    }

    /// Try to spend `requests` from the current window
    ///
    /// Rolls the window over first if it has elapsed. A denial leaves the
    /// consumed count untouched.
    pub fn reserve(&self, requests: u32) -> Reservation {
        let now = self.clock.now();
        let mut window = self.window.lock();
        self.roll_if_elapsed(&mut window, now);

        let wanted = window.consumed.saturating_add(requests);
        if wanted > window.allowed {
            let retry_after = duration_until(now, window.ends_at());
            debug!(
                requested = requests,
                consumed = window.consumed,
                allowed = window.allowed,
                retry_after_secs = retry_after.as_secs(),
                "rate budget denied"
            );
            return Reservation::Denied { retry_after };
        }

        window.consumed = wanted;
        Reservation::Granted { remaining: window.remaining() }
    }

    /// Reconcile local tracking with values reported by the remote API
    ///
    /// The server is authoritative: `allowed` becomes `limit`, `consumed`
    /// becomes `limit - remaining` and the window ends at `reset_at`.
    pub fn record_window_from_response(&self, limit: u32, remaining: u32, reset_at: DateTime<Utc>) {
        if remaining > limit {
            warn!(limit, remaining, "server reported more remaining requests than its limit");
        }

        let mut window = self.window.lock();
        let local_consumed = window.consumed;

        window.allowed = limit;
        window.consumed = limit.saturating_sub(remaining);
        window.length = self.config.window;
        window.started_at =
            reset_at.checked_sub_signed(to_chrono(self.config.window)).unwrap_or(reset_at);

        if local_consumed != window.consumed {
            debug!(
                local_consumed,
                server_consumed = window.consumed,
                limit,
                "rate budget reconciled with server"
            );
        }
    }

    /// Current consumed/allowed and time to reset
    pub fn usage_snapshot(&self) -> RateUsage {
        let now = self.clock.now();
        let mut window = self.window.lock();
        self.roll_if_elapsed(&mut window, now);

        let ends_at = window.ends_at();
        RateUsage {
            consumed: window.consumed,
            allowed: window.allowed,
            resets_in: duration_until(now, ends_at),
            window_ends_at: ends_at,
        }
    }

    /// Copy of the current window
    pub fn window(&self) -> RateWindow {
        *self.window.lock()
    }

    fn roll_if_elapsed(&self, window: &mut RateWindow, now: DateTime<Utc>) {
        if now >= window.ends_at() {
            window.consumed = 0;
            window.started_at = now;
            window.length = self.config.window;
        }
    }
}

impl RateBudget<SystemClock> {
    /// Create a new rate budget with the system clock
    pub fn new(config: RateBudgetConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, SystemClock)
    }
}
