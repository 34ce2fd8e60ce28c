//! Worker runner: the loop that drains the queue and executes jobs.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, watch};
use tokio::time;

use osfs_core::config::WorkerConfig;
use osfs_core::result::AppResult;

use crate::executor::{JobExecutionError, JobExecutor};
use crate::queue::{Job, JobQueue};

/// How long shutdown waits for in-flight jobs.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// How a job was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// The handler succeeded.
    Completed,
    /// A retryable failure with attempts left; the job is queued again.
    Retried,
    /// A permanent failure or the last attempt failed.
    Failed,
}

/// Polls the queue and executes jobs with bounded concurrency.
#[derive(Debug)]
pub struct WorkerRunner {
    queue: Arc<JobQueue>,
    executor: Arc<JobExecutor>,
    config: WorkerConfig,
}

impl WorkerRunner {
    /// Create a new worker runner.
    pub fn new(queue: Arc<JobQueue>, executor: Arc<JobExecutor>, config: WorkerConfig) -> Self {
        Self {
            queue,
            executor,
            config,
        }
    }

    /// Run until `cancel` turns `true`, then wait for in-flight jobs.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        let worker_id = self.queue.worker_id().to_string();
        let concurrency = self.config.concurrency.max(1);
        tracing::info!(
            worker_id = %worker_id,
            concurrency,
            poll_interval_seconds = self.config.poll_interval_seconds,
            handlers = ?self.executor.registered_types(),
            "Worker started"
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds.max(1));

        loop {
            if *cancel.borrow() {
                break;
            }
            let dispatched = self.poll_and_spawn(&semaphore).await;
            if dispatched {
                continue;
            }

            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        tracing::info!(worker_id = %worker_id, "Worker received shutdown signal");
                        break;
                    }
                }
                _ = self.queue.notified() => {}
                _ = time::sleep(poll_interval) => {}
            }
        }

        tracing::info!(worker_id = %worker_id, "Waiting for in-flight jobs to complete");
        let permits = u32::try_from(concurrency).unwrap_or(u32::MAX);
        if time::timeout(DRAIN_TIMEOUT, semaphore.acquire_many(permits))
            .await
            .is_err()
        {
            tracing::warn!(worker_id = %worker_id, "In-flight jobs did not finish before shutdown");
        }
        tracing::info!(worker_id = %worker_id, "Worker shut down");
    }

    /// Execute the next pending job inline. Returns `None` when the queue
    /// is empty.
    pub async fn process_next(&self) -> AppResult<Option<JobOutcome>> {
        let Some(job) = self.queue.dequeue().await? else {
            return Ok(None);
        };
        Ok(Some(settle(&self.queue, &self.executor, job).await))
    }

    /// Execute pending jobs inline until the queue is empty, retries
    /// included. Returns the number of executions.
    pub async fn drain(&self) -> AppResult<usize> {
        let mut executed = 0;
        while self.process_next().await?.is_some() {
            executed += 1;
        }
        Ok(executed)
    }

    /// Hand one job to a spawned task if a slot is free. Returns whether
    /// a job was dispatched.
    async fn poll_and_spawn(&self, semaphore: &Arc<Semaphore>) -> bool {
        let Ok(permit) = Arc::clone(semaphore).try_acquire_owned() else {
            tracing::trace!("All worker slots occupied");
            // Wait for a slot instead of spinning.
            if let Ok(permit) = Arc::clone(semaphore).acquire_owned().await {
                drop(permit);
            }
            return true;
        };

        let job = match self.queue.dequeue().await {
            Ok(Some(job)) => job,
            Ok(None) => return false,
            Err(e) => {
                tracing::error!(error = %e, "Failed to claim job");
                return false;
            }
        };

        let queue = Arc::clone(&self.queue);
        let executor = Arc::clone(&self.executor);
        tokio::spawn(async move {
            let _permit = permit;
            settle(&queue, &executor, job).await;
        });
        true
    }
}

/// Execute `job` and record the result on the queue.
async fn settle(queue: &JobQueue, executor: &JobExecutor, job: Job) -> JobOutcome {
    let (outcome, recorded) = match executor.execute(&job).await {
        Ok(result) => {
            tracing::info!(job_id = %job.id, job_type = %job.job_type, result = ?result, "Job completed");
            (JobOutcome::Completed, queue.complete(&job).await)
        }
        Err(err) if err.is_retryable() && job.has_attempts_left() => {
            tracing::warn!(
                job_id = %job.id,
                job_type = %job.job_type,
                attempt = job.attempts + 1,
                error = %err,
                "Job failed, will retry"
            );
            (JobOutcome::Retried, queue.retry(&job, &err.to_string()).await)
        }
        Err(err) => {
            let message = match &err {
                JobExecutionError::Permanent(msg) | JobExecutionError::Transient(msg) => msg.clone(),
                JobExecutionError::Internal(e) => e.to_string(),
            };
            tracing::error!(
                job_id = %job.id,
                job_type = %job.job_type,
                attempts = job.attempts + 1,
                error = %message,
                "Job failed permanently"
            );
            (JobOutcome::Failed, queue.fail(&job, &message).await)
        }
    };
    // The claim stays in place; lease recovery hands the job out again.
    if let Err(e) = recorded {
        tracing::error!(job_id = %job.id, error = %e, "Failed to record job outcome");
    }
    outcome
}
