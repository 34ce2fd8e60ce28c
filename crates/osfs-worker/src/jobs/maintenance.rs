//! Upkeep of the job table itself.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::executor::{JobExecutionError, JobHandler};
use crate::queue::{Job, JobQueue};

/// Requeues jobs abandoned by a stopped worker and purges old finished ones.
#[derive(Debug)]
pub struct JobMaintenanceHandler {
    queue: Arc<JobQueue>,
    lease: Duration,
    retention: Duration,
}

impl JobMaintenanceHandler {
    /// Create a maintenance handler. Running jobs older than `lease` are
    /// requeued; finished jobs older than `retention` are deleted.
    pub fn new(queue: Arc<JobQueue>, lease: Duration, retention: Duration) -> Self {
        Self {
            queue,
            lease,
            retention,
        }
    }
}

#[async_trait]
impl JobHandler for JobMaintenanceHandler {
    fn job_type(&self) -> &str {
        "job_maintenance"
    }

    async fn execute(&self, _job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let requeued = self.queue.recover_stale(self.lease).await?;
        let purged = self.queue.purge_finished(self.retention).await?;
        tracing::info!(requeued, purged, "Job table maintenance finished");

        Ok(Some(json!({
            "task": "job_maintenance",
            "requeued": requeued,
            "purged": purged,
        })))
    }
}
