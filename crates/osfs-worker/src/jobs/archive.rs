//! Archive backfill jobs.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use osfs_service::{BackgroundTask, VersionService};

use super::task_of;
use crate::executor::{JobExecutionError, JobHandler};
use crate::queue::Job;

/// Copies archive pointers onto one freshly uploaded version.
#[derive(Debug)]
pub struct ArchiveMatchHandler {
    versions: Arc<VersionService>,
}

impl ArchiveMatchHandler {
    /// Create a new archive match handler.
    pub fn new(versions: Arc<VersionService>) -> Self {
        Self { versions }
    }
}

#[async_trait]
impl JobHandler for ArchiveMatchHandler {
    fn job_type(&self) -> &str {
        "archive_match"
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let BackgroundTask::ArchiveMatch { version_id } = task_of(job)? else {
            return Err(JobExecutionError::Permanent(format!(
                "Job {} is not an archive match",
                job.id
            )));
        };

        let matched = self.versions.find_matching_archive(version_id).await?;
        Ok(Some(json!({
            "version_id": version_id,
            "matched": matched,
        })))
    }
}

/// Periodic sweep over versions that still lack archive info.
#[derive(Debug)]
pub struct ArchiveSweepHandler {
    versions: Arc<VersionService>,
    /// Versions examined when the payload names no batch.
    default_batch: u64,
}

impl ArchiveSweepHandler {
    /// Create a new sweep handler.
    pub fn new(versions: Arc<VersionService>, default_batch: u64) -> Self {
        Self {
            versions,
            default_batch,
        }
    }
}

#[async_trait]
impl JobHandler for ArchiveSweepHandler {
    fn job_type(&self) -> &str {
        "archive_sweep"
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let batch = job
            .payload
            .get("batch")
            .and_then(Value::as_u64)
            .unwrap_or(self.default_batch);

        tracing::info!(batch, "Running archive sweep");
        let matched = self.versions.archive_sweep(batch).await?;
        tracing::info!(matched, "Archive sweep finished");

        Ok(Some(json!({
            "task": "archive_sweep",
            "batch": batch,
            "matched": matched,
        })))
    }
}
