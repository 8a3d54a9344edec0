//! Wall-clock abstraction for testability
//!
//! Provides a trait-based approach to reading the current time so that
//! cooldowns, rate windows and lookback cutoffs can be tested without real
//! time passing.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use daosync_common::time::{Clock, MockClock};
//!
//! let clock = MockClock::new();
//! let start = clock.now();
//!
//! // Simulate 5 seconds passing
//! clock.advance(Duration::from_secs(5));
//!
//! assert_eq!((clock.now() - start).num_seconds(), 5);
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

/// Trait for reading the current wall-clock time
pub trait Clock: Send + Sync {
    /// Current UTC time
    fn now(&self) -> DateTime<Utc>;
}

/// Shared, type-erased clock handle
pub type SharedClock = Arc<dyn Clock>;

/// Implement Clock for Arc<T> where T: Clock for convenient sharing
impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Real system clock implementation
///
/// Use this in production code.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Mock clock for deterministic testing
///
/// Clones share the same underlying time, so a test can hand one clone to
/// the code under test and advance the other.
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// Create a mock clock starting at the current real time
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Create a mock clock starting at a fixed instant
    pub fn at(start: DateTime<Utc>) -> Self {
        Self { current: Arc::new(Mutex::new(start)) }
    }

    /// Create a mock clock from a UNIX timestamp in seconds
    ///
    /// Falls back to the UNIX epoch for out-of-range values.
    pub fn from_timestamp(secs: i64) -> Self {
        Self::at(Utc.timestamp_opt(secs, 0).single().unwrap_or_default())
    }

    /// Advance the mock clock by a duration
    ///
    /// Advances that would overflow the representable range are ignored.
    pub fn advance(&self, duration: Duration) {
        let Ok(delta) = chrono::Duration::from_std(duration) else {
            return;
        };
        let mut current = self.current.lock();
        if let Some(next) = current.checked_add_signed(delta) {
            *current = next;
        }
    }

    /// Set the mock clock to an absolute time
    pub fn set(&self, now: DateTime<Utc>) {
        *self.current.lock() = now;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}

/// Time remaining from `from` until `to`, saturating at zero.
pub fn duration_until(from: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
    (to - from).to_std().unwrap_or(Duration::ZERO)
}

/// Convert a std duration into a chrono delta, saturating on overflow.
pub fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}
