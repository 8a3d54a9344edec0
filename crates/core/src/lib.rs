//! # DaoSync Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for the timeline API and the stores
//! - The sync log
//! - The sync orchestrator and its recurring schedule
//!
//! ## Architecture Principles
//! - Only depends on `daosync-common` and `daosync-domain`
//! - No database or HTTP code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod sync;

pub use sync::ports::{AccountRepository, PostRepository, SyncLogRepository, TimelineApi};
pub use sync::{ScheduleError, SyncControlError, SyncLog, SyncOrchestrator, SyncPorts, SyncStatus};
