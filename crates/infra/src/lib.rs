//! # DaoSync Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - SQLite repositories for posts, tracked accounts and the sync log
//! - A retrying HTTP client and the timeline API client built on it
//! - Configuration loading (file + environment)
//! - `tracing` subscriber setup
//!
//! ## Architecture
//! - Implements traits defined in `daosync-core`
//! - Contains all "impure" code (I/O, network, process environment)

pub mod api;
pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use api::HttpTimelineClient;
pub use database::{DbManager, SqliteAccountRepository, SqlitePostRepository, SqliteSyncLogRepository};
pub use errors::InfraError;
pub use http::HttpClient;
pub use observability::init_tracing;
