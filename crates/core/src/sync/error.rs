//! Sync control errors

use std::time::Duration;

use chrono::{DateTime, Utc};
use daosync_domain::DaoSyncError;
use thiserror::Error;

/// Why `run_once` refused to start a run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncControlError {
    /// Another run holds the run guard
    #[error("A sync run is already in progress")]
    AlreadyRunning,

    /// A previous run hit an API failure and the cooldown has not expired
    #[error("Sync is cooling down for another {}s (until {until})", remaining.as_secs())]
    CoolingDown { remaining: Duration, until: DateTime<Utc> },
}

/// Schedule lifecycle errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("Sync schedule already enabled")]
    AlreadyEnabled,

    #[error("Sync schedule not enabled")]
    NotEnabled,

    /// `start_schedule` was called outside a tokio runtime
    #[error("No tokio runtime available to drive the sync schedule")]
    NoRuntime,
}

impl From<SyncControlError> for DaoSyncError {
    fn from(err: SyncControlError) -> Self {
        DaoSyncError::InvalidInput(err.to_string())
    }
}

impl From<ScheduleError> for DaoSyncError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::AlreadyEnabled | ScheduleError::NotEnabled => {
                DaoSyncError::InvalidInput(err.to_string())
            }
            ScheduleError::NoRuntime => DaoSyncError::Internal(err.to_string()),
        }
    }
}
