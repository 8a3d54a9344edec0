//! Remote timeline API adapter
//!
//! [`HttpTimelineClient`] implements the core `TimelineApi` port over the
//! retrying [`crate::http::HttpClient`]. Status codes are classified through
//! [`ApiError`] before they reach the orchestrator as `DaoSyncError`.

pub mod errors;
pub mod timeline_client;

pub use errors::ApiError;
pub use timeline_client::HttpTimelineClient;
