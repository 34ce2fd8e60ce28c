//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background job worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of concurrent job processing tasks.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Interval in seconds between queue polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Attempts before a job is dropped.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Cron expression for the archive backfill sweep.
    #[serde(default = "default_archive_sweep_cron")]
    pub archive_sweep_cron: String,
    /// Number of versions examined per sweep run.
    #[serde(default = "default_sweep_batch")]
    pub archive_sweep_batch: u64,
    /// Seconds a claimed job may stay running before it is handed out again.
    #[serde(default = "default_job_lease")]
    pub job_lease_seconds: u64,
    /// Hours finished jobs are kept before they are purged.
    #[serde(default = "default_job_retention")]
    pub job_retention_hours: u64,
    /// Cron expression for job table maintenance.
    #[serde(default = "default_job_maintenance_cron")]
    pub job_maintenance_cron: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            concurrency: default_concurrency(),
            poll_interval_seconds: default_poll_interval(),
            max_attempts: default_max_attempts(),
            archive_sweep_cron: default_archive_sweep_cron(),
            archive_sweep_batch: default_sweep_batch(),
            job_lease_seconds: default_job_lease(),
            job_retention_hours: default_job_retention(),
            job_maintenance_cron: default_job_maintenance_cron(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    4
}

fn default_poll_interval() -> u64 {
    1
}

fn default_max_attempts() -> u32 {
    3
}

fn default_archive_sweep_cron() -> String {
    "0 0 3 * * *".to_string()
}

fn default_sweep_batch() -> u64 {
    200
}

fn default_job_lease() -> u64 {
    900
}

fn default_job_retention() -> u64 {
    168
}

fn default_job_maintenance_cron() -> String {
    "0 */10 * * * *".to_string()
}
