//! Built-in job handlers.

pub mod archive;
pub mod checkout;
pub mod maintenance;

pub use archive::{ArchiveMatchHandler, ArchiveSweepHandler};
pub use checkout::ReleaseCheckoutsHandler;
pub use maintenance::JobMaintenanceHandler;

use osfs_service::BackgroundTask;

use crate::executor::JobExecutionError;
use crate::queue::Job;

/// Decode the task a job was enqueued from.
pub(crate) fn task_of(job: &Job) -> Result<BackgroundTask, JobExecutionError> {
    serde_json::from_value(job.payload.clone()).map_err(|e| {
        JobExecutionError::Permanent(format!("Invalid payload for job {}: {e}", job.id))
    })
}
