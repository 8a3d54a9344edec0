//! Storage and transport failures as domain errors.

use daosync_domain::DaoSyncError;
use rusqlite::ffi::ErrorCode;

/// An infrastructure failure already classified for the domain
#[derive(Debug)]
pub struct InfraError(pub DaoSyncError);

impl From<InfraError> for DaoSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<rusqlite::Error> for InfraError {
    fn from(err: rusqlite::Error) -> Self {
        let contended = matches!(
            &err,
            rusqlite::Error::SqliteFailure(failure, _)
                if matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        );

        // Another writer outlasted the connection's busy timeout
        if contended {
            return InfraError(DaoSyncError::Database(format!("sync store is locked: {err}")));
        }
        InfraError(DaoSyncError::Database(err.to_string()))
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(err: r2d2::Error) -> Self {
        InfraError(DaoSyncError::Database(format!("no sqlite connection available: {err}")))
    }
}

impl From<reqwest::Error> for InfraError {
    fn from(err: reqwest::Error) -> Self {
        let mapped = if err.is_builder() {
            DaoSyncError::Config(format!("cannot build API request: {err}"))
        } else if err.is_timeout() {
            DaoSyncError::Network(format!("API request timed out: {err}"))
        } else {
            DaoSyncError::Network(err.to_string())
        };
        InfraError(mapped)
    }
}
