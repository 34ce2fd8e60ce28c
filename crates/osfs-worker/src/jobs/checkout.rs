//! Cascading check-in after a user loses access.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use osfs_service::{BackgroundTask, CheckoutService};

use super::task_of;
use crate::executor::{JobExecutionError, JobHandler};
use crate::queue::Job;

/// Checks in every file a user holds, optionally within one container.
#[derive(Debug)]
pub struct ReleaseCheckoutsHandler {
    checkout: Arc<CheckoutService>,
}

impl ReleaseCheckoutsHandler {
    /// Create a new release handler.
    pub fn new(checkout: Arc<CheckoutService>) -> Self {
        Self { checkout }
    }
}

#[async_trait]
impl JobHandler for ReleaseCheckoutsHandler {
    fn job_type(&self) -> &str {
        "release_checkouts"
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let BackgroundTask::ReleaseCheckouts {
            user_id,
            container_id,
        } = task_of(job)?
        else {
            return Err(JobExecutionError::Permanent(format!(
                "Job {} is not a checkout release",
                job.id
            )));
        };

        let released = self
            .checkout
            .release_user_checkouts(user_id, container_id)
            .await?;

        // A sweep that skipped rows leaves them checked out; another attempt picks them up.
        let remaining = self.checkout.checked_out_by(user_id, container_id).await?;
        if !remaining.is_empty() {
            return Err(JobExecutionError::Transient(format!(
                "{} checkouts of {user_id} could not be released",
                remaining.len()
            )));
        }

        Ok(Some(json!({
            "user_id": user_id,
            "container_id": container_id,
            "released": released,
        })))
    }
}
