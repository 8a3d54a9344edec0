//! Timeline API error classification
//!
//! Non-success responses are sorted into categories before they cross the
//! port boundary as `DaoSyncError`.

use daosync_domain::DaoSyncError;
use reqwest::StatusCode;
use thiserror::Error;

/// Timeline API operation errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Classify a non-success status
    pub fn from_status(status: StatusCode, path: &str, body: &str) -> Self {
        let message = if body.is_empty() {
            format!("{path} returned status {status}")
        } else {
            format!("{path} returned status {status}: {}", truncate(body, 200))
        };

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Self::Auth(message)
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            Self::RateLimit(message)
        } else if status.is_server_error() {
            Self::Server(message)
        } else if status.is_client_error() {
            Self::Client(message)
        } else {
            Self::Network(message)
        }
    }
}

impl From<ApiError> for DaoSyncError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Auth(message) => DaoSyncError::Auth(message),
            ApiError::RateLimit(message) => DaoSyncError::RateLimited(message),
            ApiError::Server(message) | ApiError::Network(message) => {
                DaoSyncError::Network(message)
            }
            ApiError::Client(message) => DaoSyncError::InvalidInput(message),
            ApiError::Malformed(message) => DaoSyncError::MalformedResponse(message),
        }
    }
}

fn truncate(body: &str, max_chars: usize) -> &str {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
