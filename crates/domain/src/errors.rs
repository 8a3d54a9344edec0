//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ApiResponse, RateLimitInfo};

/// Main error type for DaoSync
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum DaoSyncError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    /// The remote API rejected a request with HTTP 429
    #[error("Rate limited by remote API: {0}")]
    RateLimited(String),

    /// The remote API answered with a payload we could not decode
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for DaoSync operations
pub type Result<T> = std::result::Result<T, DaoSyncError>;

/// A failed remote API call
///
/// Error responses (429 above all) still carry the server's rate-limit
/// headers; they must reach the rate budget just like those of a success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{error}")]
pub struct ApiFailure {
    pub error: DaoSyncError,
    pub rate_limit: Option<RateLimitInfo>,
}

impl ApiFailure {
    pub fn new(error: DaoSyncError, rate_limit: Option<RateLimitInfo>) -> Self {
        Self { error, rate_limit }
    }
}

impl From<DaoSyncError> for ApiFailure {
    fn from(error: DaoSyncError) -> Self {
        Self { error, rate_limit: None }
    }
}

/// Outcome of one remote API call
pub type ApiResult<T> = std::result::Result<ApiResponse<T>, ApiFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_type_tag() {
        let err = DaoSyncError::Auth("token rejected".into());
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["type"], "Auth");
        assert_eq!(json["message"], "token rejected");
    }

    #[test]
    fn test_display_names_the_failure_kind() {
        let err = DaoSyncError::RateLimited("429 Too Many Requests".into());
        assert_eq!(err.to_string(), "Rate limited by remote API: 429 Too Many Requests");
    }

    #[test]
    fn test_api_failure_displays_the_underlying_error() {
        let reset_at = chrono::DateTime::from_timestamp(1_700_000_900, 0).unwrap();
        let failure = ApiFailure::new(
            DaoSyncError::RateLimited("slow down".into()),
            Some(RateLimitInfo { limit: 900, remaining: 0, reset_at }),
        );

        assert_eq!(failure.to_string(), "Rate limited by remote API: slow down");
        assert_eq!(ApiFailure::from(DaoSyncError::Auth("nope".into())).rate_limit, None);
    }
}
