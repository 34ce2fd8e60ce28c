//! Cron scheduler for periodic maintenance.

use std::sync::Arc;

use serde_json::json;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use osfs_core::config::WorkerConfig;
use osfs_core::error::AppError;
use osfs_core::result::AppResult;

use crate::queue::JobQueue;

/// Enqueues periodic jobs on their cron schedule.
pub struct CronScheduler {
    scheduler: JobScheduler,
    queue: Arc<JobQueue>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler.
    pub async fn new(queue: Arc<JobQueue>) -> AppResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self { scheduler, queue })
    }

    /// Register every periodic job.
    pub async fn register_default_tasks(&self, config: &WorkerConfig) -> AppResult<()> {
        self.register(
            "archive_sweep",
            &config.archive_sweep_cron,
            json!({ "batch": config.archive_sweep_batch }),
        )
        .await?;
        self.register("job_maintenance", &config.job_maintenance_cron, json!({}))
            .await?;

        tracing::info!("All scheduled tasks registered");
        Ok(())
    }

    /// Enqueue a `job_type` job with `payload` on every tick of `cron`.
    pub async fn register(
        &self,
        job_type: &'static str,
        cron: &str,
        payload: serde_json::Value,
    ) -> AppResult<()> {
        let queue = Arc::clone(&self.queue);
        let job = CronJob::new_async(cron, move |_uuid, _lock| {
            let queue = Arc::clone(&queue);
            let payload = payload.clone();
            Box::pin(async move {
                tracing::debug!(job_type, "Scheduling periodic job");
                if let Err(e) = queue.enqueue(job_type, payload).await {
                    tracing::error!(job_type, error = %e, "Failed to enqueue periodic job");
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid schedule {cron:?} for {job_type}: {e}"))
        })?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add {job_type} schedule: {e}"))
        })?;

        tracing::info!(job_type, cron = %cron, "Registered periodic job");
        Ok(())
    }

    /// Start the scheduler.
    pub async fn start(&mut self) -> AppResult<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Stop the scheduler.
    pub async fn shutdown(&mut self) -> AppResult<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shut down scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}
