//! Timeline sync: ports, the sync log and the orchestrator

pub mod error;
pub mod log;
pub mod orchestrator;
pub mod ports;
mod schedule;

pub use error::{ScheduleError, SyncControlError};
pub use log::SyncLog;
pub use orchestrator::{SyncOrchestrator, SyncPorts, SyncStatus};
pub use ports::{AccountRepository, PostRepository, SyncLogRepository, TimelineApi};
