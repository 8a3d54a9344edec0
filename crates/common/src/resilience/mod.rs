//! Resilience patterns for talking to rate-limited remote services
//!
//! - **Rate Budget**: local request accounting for a remote rate-limit
//!   window, reconciled against server-reported limits

pub mod rate_budget;

use thiserror::Error;

pub use rate_budget::{RateBudget, RateBudgetConfig, RateUsage, RateWindow, Reservation};

/// Simple configuration error for validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid { message: message.into() }
    }
}
