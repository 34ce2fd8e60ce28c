//! Durable job queue.
//!
//! The engine hands tasks over through [`BackgroundTasks`]; the runner
//! claims them oldest first. Jobs live in a [`JobRepository`], so work
//! queued before a shutdown or crash is picked up after the next start.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Notify;

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_database::JobRepository;
use osfs_entity::job::JobStatus;
use osfs_service::{BackgroundTask, BackgroundTasks};

pub use osfs_entity::job::Job;

/// Queue counters, read from the job table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Jobs waiting to run.
    pub pending: u64,
    /// Jobs claimed and not yet settled.
    pub running: u64,
    /// Finished jobs not yet purged.
    pub completed: u64,
    /// Failed jobs not yet purged.
    pub failed: u64,
    /// Worker that owns the queue.
    pub worker_id: String,
}

/// Job queue shared by the engine, the scheduler and the runner.
pub struct JobQueue {
    repo: Arc<dyn JobRepository>,
    /// Wakes the runner when work arrives.
    notify: Notify,
    worker_id: String,
    max_attempts: i32,
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("worker_id", &self.worker_id)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl JobQueue {
    /// Create a queue over `repo`, claiming jobs as `worker_id`.
    pub fn new(repo: Arc<dyn JobRepository>, worker_id: impl Into<String>, max_attempts: u32) -> Self {
        Self {
            repo,
            notify: Notify::new(),
            worker_id: worker_id.into(),
            max_attempts: i32::try_from(max_attempts.max(1)).unwrap_or(i32::MAX),
        }
    }

    /// The owning worker's identifier.
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Persist a new `job_type` job and wake the runner.
    pub async fn enqueue(&self, job_type: impl Into<String>, payload: Value) -> AppResult<Job> {
        let job = self
            .repo
            .insert_job(&Job::new(job_type, payload, self.max_attempts))
            .await?;
        self.notify.notify_one();

        tracing::debug!(job_id = %job.id, job_type = %job.job_type, "Enqueued job");
        Ok(job)
    }

    /// Claim the oldest pending job.
    pub async fn dequeue(&self) -> AppResult<Option<Job>> {
        let job = self.repo.claim_next_job(&self.worker_id).await?;
        if let Some(job) = &job {
            tracing::debug!(
                job_id = %job.id,
                job_type = %job.job_type,
                attempt = job.attempts + 1,
                "Dequeued job"
            );
        }
        Ok(job)
    }

    /// Settle a job as successful.
    pub async fn complete(&self, job: &Job) -> AppResult<()> {
        self.repo.complete_job(job.id).await?;
        tracing::debug!(job_id = %job.id, "Job completed");
        Ok(())
    }

    /// Settle a job as failed for good.
    pub async fn fail(&self, job: &Job, error: &str) -> AppResult<()> {
        self.repo.fail_job(job.id, error).await?;
        tracing::debug!(job_id = %job.id, error = %error, "Job failed");
        Ok(())
    }

    /// Return a job to the pending set with one more attempt counted.
    pub async fn retry(&self, job: &Job, error: &str) -> AppResult<()> {
        self.repo.release_job(job.id, error).await?;
        self.notify.notify_one();
        tracing::debug!(job_id = %job.id, attempts = job.attempts + 1, "Job re-queued");
        Ok(())
    }

    /// Put back jobs whose worker has held them longer than `lease`. A
    /// worker that died mid-job leaves its claim behind; this is how the
    /// job gets another run.
    pub async fn recover_stale(&self, lease: Duration) -> AppResult<u64> {
        let lease = chrono::Duration::from_std(lease)
            .map_err(|e| AppError::configuration(format!("Invalid job lease: {e}")))?;
        let requeued = self.repo.requeue_stale_jobs(Utc::now() - lease).await?;
        if requeued > 0 {
            tracing::warn!(requeued, "Requeued jobs left running by a stopped worker");
            self.notify.notify_one();
        }
        Ok(requeued)
    }

    /// Delete completed and failed jobs older than `retention`.
    pub async fn purge_finished(&self, retention: Duration) -> AppResult<u64> {
        let retention = chrono::Duration::from_std(retention)
            .map_err(|e| AppError::configuration(format!("Invalid job retention: {e}")))?;
        let purged = self.repo.purge_finished_jobs(Utc::now() - retention).await?;
        tracing::debug!(purged, "Purged finished jobs");
        Ok(purged)
    }

    /// Current counters.
    pub async fn stats(&self) -> AppResult<QueueStats> {
        Ok(QueueStats {
            pending: self.repo.count_jobs(JobStatus::Pending).await?,
            running: self.repo.count_jobs(JobStatus::Running).await?,
            completed: self.repo.count_jobs(JobStatus::Completed).await?,
            failed: self.repo.count_jobs(JobStatus::Failed).await?,
            worker_id: self.worker_id.clone(),
        })
    }

    /// Wait until a job is enqueued or re-queued.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}

#[async_trait]
impl BackgroundTasks for JobQueue {
    async fn dispatch(&self, task: BackgroundTask) -> AppResult<()> {
        let payload = serde_json::to_value(&task)?;
        self.enqueue(task.name(), payload).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osfs_core::types::VersionId;
    use osfs_database::MemoryJobStore;

    fn queue(store: &MemoryJobStore, max_attempts: u32) -> JobQueue {
        JobQueue::new(Arc::new(store.clone()), "w-1", max_attempts)
    }

    #[tokio::test]
    async fn test_claim_order_and_counters() {
        let store = MemoryJobStore::new();
        let queue = queue(&store, 2);
        queue.enqueue("a", Value::Null).await.unwrap();
        queue.enqueue("b", Value::Null).await.unwrap();

        let first = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(first.job_type, "a");
        queue.retry(&first, "busy").await.unwrap();

        // A re-queued job keeps its place ahead of newer work.
        let again = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.attempts, 1);
        assert!(!again.has_attempts_left());
        queue.fail(&again, "boom").await.unwrap();

        let second = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(second.job_type, "b");
        queue.complete(&second).await.unwrap();

        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.running, 0);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.worker_id, "w-1");
    }

    #[tokio::test]
    async fn test_dispatch_serializes_task() {
        let store = MemoryJobStore::new();
        let queue = queue(&store, 3);
        let version_id = VersionId::new();
        queue
            .dispatch(BackgroundTask::ArchiveMatch { version_id })
            .await
            .unwrap();

        let job = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(job.job_type, "archive_match");
        assert_eq!(job.max_attempts, 3);
        assert_eq!(job.worker_id.as_deref(), Some("w-1"));
        let task: BackgroundTask = serde_json::from_value(job.payload).unwrap();
        assert_eq!(task, BackgroundTask::ArchiveMatch { version_id });
    }

    #[tokio::test]
    async fn test_zero_lease_recovers_every_claim() {
        let store = MemoryJobStore::new();
        let queue = queue(&store, 3);
        let job = queue.enqueue("a", Value::Null).await.unwrap();
        queue.dequeue().await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(queue.recover_stale(Duration::ZERO).await.unwrap(), 1);
        assert_eq!(queue.dequeue().await.unwrap().unwrap().id, job.id);
        assert_eq!(queue.recover_stale(Duration::from_secs(3600)).await.unwrap(), 0);
    }
}
