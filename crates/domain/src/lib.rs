//! # DaoSync Domain
//!
//! Business domain types and models for DaoSync.
//!
//! This crate contains:
//! - Domain data types (TrackedAccount, Post, SyncRunStats, etc.)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other DaoSync crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
