//! Background job processing and scheduled tasks for osfstorage.
//!
//! This crate provides:
//! - A durable job queue that the engine dispatches best-effort tasks to
//! - A job executor that routes jobs to the handler for their type
//! - A worker runner that drains the queue with bounded concurrency
//! - A cron scheduler for the archive sweep and job table maintenance

pub mod executor;
pub mod jobs;
pub mod queue;
pub mod runner;
pub mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use osfs_core::config::WorkerConfig;
use osfs_service::Services;

pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use queue::{Job, JobQueue, QueueStats};
pub use runner::{JobOutcome, WorkerRunner};
pub use scheduler::CronScheduler;

/// Executor with every built-in handler registered against `services`.
pub fn default_executor(
    services: &Services,
    queue: &Arc<JobQueue>,
    config: &WorkerConfig,
) -> JobExecutor {
    let mut executor = JobExecutor::new();
    executor.register(Arc::new(jobs::ArchiveMatchHandler::new(Arc::clone(
        &services.versions,
    ))));
    executor.register(Arc::new(jobs::ArchiveSweepHandler::new(
        Arc::clone(&services.versions),
        config.archive_sweep_batch,
    )));
    executor.register(Arc::new(jobs::ReleaseCheckoutsHandler::new(Arc::clone(
        &services.checkout,
    ))));
    executor.register(Arc::new(jobs::JobMaintenanceHandler::new(
        Arc::clone(queue),
        Duration::from_secs(config.job_lease_seconds),
        Duration::from_secs(config.job_retention_hours.saturating_mul(3600)),
    )));
    executor
}
