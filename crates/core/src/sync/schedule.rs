//! Recurring sync schedule
//!
//! A background task that calls [`SyncOrchestrator::run_once`] every
//! interval until cancelled. The task only holds a weak reference, so
//! dropping the orchestrator ends the loop at its next tick.

use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::error::{ScheduleError, SyncControlError};
use super::orchestrator::SyncOrchestrator;

/// Handle to a running schedule task
pub(crate) struct ScheduleHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ScheduleHandle {
    pub(crate) fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && !self.task.is_finished()
    }

    /// Stop future ticks; the task itself is detached so a run in progress
    /// completes.
    pub(crate) fn cancel(self) {
        self.cancel.cancel();
    }
}

/// Spawn the schedule loop on the current tokio runtime
pub(crate) fn spawn(
    orchestrator: Weak<SyncOrchestrator>,
    interval: Duration,
) -> Result<ScheduleHandle, ScheduleError> {
    let runtime = Handle::try_current().map_err(|_| ScheduleError::NoRuntime)?;
    let cancel = CancellationToken::new();
    let task = runtime.spawn(schedule_loop(orchestrator, interval, cancel.clone()));

    Ok(ScheduleHandle { cancel, task })
}

async fn schedule_loop(
    orchestrator: Weak<SyncOrchestrator>,
    interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Sync schedule cancelled");
                break;
            }
            _ = tokio::time::sleep(interval) => {
                let Some(orchestrator) = orchestrator.upgrade() else {
                    debug!("Sync orchestrator dropped; schedule exiting");
                    break;
                };

                match orchestrator.run_once().await {
                    Ok(stats) => debug!(
                        added = stats.posts_added,
                        updated = stats.posts_updated,
                        errors = stats.errors.len(),
                        "Scheduled sync run completed"
                    ),
                    Err(SyncControlError::AlreadyRunning) => {
                        info!("Scheduled sync skipped: a run is already in progress");
                    }
                    Err(err @ SyncControlError::CoolingDown { .. }) => {
                        info!(reason = %err, "Scheduled sync skipped");
                    }
                }
            }
        }
    }
}
