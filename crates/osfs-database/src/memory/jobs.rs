//! Job table kept in process memory.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_core::types::JobId;
use osfs_entity::job::{Job, JobStatus};

use crate::store::JobRepository;

/// In-memory job queue. Clones share the same table, so a queue rebuilt
/// over a clone sees the jobs an earlier one left behind.
#[derive(Debug, Clone, Default)]
pub struct MemoryJobStore {
    jobs: Arc<Mutex<Vec<Job>>>,
}

impl MemoryJobStore {
    /// Create an empty job table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every job in insertion order.
    pub async fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().await.clone()
    }
}

fn settle(jobs: &mut [Job], id: JobId, apply: impl FnOnce(&mut Job)) -> AppResult<()> {
    let job = jobs
        .iter_mut()
        .find(|j| j.id == id)
        .ok_or_else(|| AppError::not_found(format!("Job {id} not found")))?;
    if job.status != JobStatus::Running {
        return Err(AppError::conflict(format!(
            "Job {id} is {}, not running",
            job.status
        )));
    }
    apply(job);
    job.updated_at = Utc::now();
    Ok(())
}

#[async_trait]
impl JobRepository for MemoryJobStore {
    async fn insert_job(&self, job: &Job) -> AppResult<Job> {
        let mut jobs = self.jobs.lock().await;
        if jobs.iter().any(|j| j.id == job.id) {
            return Err(AppError::conflict(format!("Job {} already exists", job.id)));
        }
        jobs.push(job.clone());
        Ok(job.clone())
    }

    async fn claim_next_job(&self, worker_id: &str) -> AppResult<Option<Job>> {
        let mut jobs = self.jobs.lock().await;
        let Some(job) = jobs
            .iter_mut()
            .filter(|j| j.status == JobStatus::Pending)
            .min_by_key(|j| j.created_at)
        else {
            return Ok(None);
        };
        job.status = JobStatus::Running;
        job.worker_id = Some(worker_id.to_string());
        job.updated_at = Utc::now();
        Ok(Some(job.clone()))
    }

    async fn complete_job(&self, id: JobId) -> AppResult<()> {
        settle(&mut self.jobs.lock().await, id, |job| {
            job.status = JobStatus::Completed;
        })
    }

    async fn fail_job(&self, id: JobId, error: &str) -> AppResult<()> {
        settle(&mut self.jobs.lock().await, id, |job| {
            job.status = JobStatus::Failed;
            job.attempts += 1;
            job.last_error = Some(error.to_string());
        })
    }

    async fn release_job(&self, id: JobId, error: &str) -> AppResult<()> {
        settle(&mut self.jobs.lock().await, id, |job| {
            job.status = JobStatus::Pending;
            job.attempts += 1;
            job.last_error = Some(error.to_string());
            job.worker_id = None;
        })
    }

    async fn requeue_stale_jobs(&self, claimed_before: DateTime<Utc>) -> AppResult<u64> {
        let mut jobs = self.jobs.lock().await;
        let mut requeued = 0;
        for job in jobs
            .iter_mut()
            .filter(|j| j.status == JobStatus::Running && j.updated_at < claimed_before)
        {
            job.status = JobStatus::Pending;
            job.worker_id = None;
            job.updated_at = Utc::now();
            requeued += 1;
        }
        Ok(requeued)
    }

    async fn purge_finished_jobs(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut jobs = self.jobs.lock().await;
        let len = jobs.len();
        jobs.retain(|j| !(j.status.is_terminal() && j.updated_at < before));
        Ok((len - jobs.len()) as u64)
    }

    async fn count_jobs(&self, status: JobStatus) -> AppResult<u64> {
        let jobs = self.jobs.lock().await;
        Ok(jobs.iter().filter(|j| j.status == status).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::Value;

    #[tokio::test]
    async fn test_claim_is_fifo_and_exclusive() {
        let store = MemoryJobStore::new();
        let first = store.insert_job(&Job::new("a", Value::Null, 3)).await.unwrap();
        store.insert_job(&Job::new("b", Value::Null, 3)).await.unwrap();

        let claimed = store.claim_next_job("w-1").await.unwrap().unwrap();
        assert_eq!(claimed.id, first.id);
        assert_eq!(claimed.worker_id.as_deref(), Some("w-1"));
        assert_eq!(store.claim_next_job("w-2").await.unwrap().unwrap().job_type, "b");
        assert!(store.claim_next_job("w-3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_settling_requires_a_running_job() {
        let store = MemoryJobStore::new();
        let job = store.insert_job(&Job::new("a", Value::Null, 3)).await.unwrap();
        let err = store.complete_job(job.id).await.unwrap_err();
        assert!(err.is(osfs_core::error::ErrorKind::Conflict));

        store.claim_next_job("w-1").await.unwrap();
        store.release_job(job.id, "busy").await.unwrap();
        let again = store.claim_next_job("w-1").await.unwrap().unwrap();
        assert_eq!(again.attempts, 1);
        assert_eq!(again.last_error.as_deref(), Some("busy"));
    }

    #[tokio::test]
    async fn test_stale_jobs_are_requeued_and_finished_ones_purged() {
        let store = MemoryJobStore::new();
        let stale = store.insert_job(&Job::new("a", Value::Null, 3)).await.unwrap();
        let done = store.insert_job(&Job::new("b", Value::Null, 3)).await.unwrap();
        store.claim_next_job("dead-worker").await.unwrap();
        store.claim_next_job("w-1").await.unwrap();
        store.complete_job(done.id).await.unwrap();

        let later = Utc::now() + Duration::seconds(1);
        assert_eq!(store.requeue_stale_jobs(later).await.unwrap(), 1);
        assert_eq!(store.count_jobs(JobStatus::Pending).await.unwrap(), 1);
        assert_eq!(store.claim_next_job("w-2").await.unwrap().unwrap().id, stale.id);

        assert_eq!(store.purge_finished_jobs(later).await.unwrap(), 1);
        assert_eq!(store.jobs().await.len(), 1);
    }
}
