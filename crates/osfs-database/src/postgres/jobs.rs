//! `jobs` table: the durable background queue.
//!
//! Claims use `FOR UPDATE SKIP LOCKED`, so several workers can poll the
//! same table without handing one job to two of them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_core::types::JobId;
use osfs_entity::job::{Job, JobStatus};

use super::db_err;
use super::rows::{JOB_COLUMNS, JobRow};
use crate::store::JobRepository;

/// Job queue persisted in PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    /// Create a job store over the pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run a status transition on a running job. `sql` binds the job id
    /// as `$1` and the error message as `$2`.
    async fn settle(&self, sql: &str, id: JobId, error: &str) -> AppResult<()> {
        let result = sqlx::query(sql)
            .bind(id)
            .bind(error)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to settle job"))?;
        ensure_settled(id, result.rows_affected())
    }
}

#[async_trait]
impl JobRepository for PgJobStore {
    async fn insert_job(&self, job: &Job) -> AppResult<Job> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "INSERT INTO jobs (id, job_type, payload, status, attempts, max_attempts, \
             last_error, worker_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {JOB_COLUMNS}"
        ))
        .bind(job.id)
        .bind(&job.job_type)
        .bind(&job.payload)
        .bind(job.status.as_str())
        .bind(job.attempts)
        .bind(job.max_attempts)
        .bind(&job.last_error)
        .bind(&job.worker_id)
        .bind(job.created_at)
        .bind(job.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to insert job"))?;
        Job::try_from(row)
    }

    async fn claim_next_job(&self, worker_id: &str) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, JobRow>(&format!(
            "UPDATE jobs SET status = 'running', worker_id = $1, updated_at = NOW() \
             WHERE id = ( \
                SELECT id FROM jobs WHERE status = 'pending' \
                ORDER BY created_at ASC \
                FOR UPDATE SKIP LOCKED LIMIT 1 \
             ) RETURNING {JOB_COLUMNS}"
        ))
        .bind(worker_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to claim job"))?
        .map(Job::try_from)
        .transpose()
    }

    async fn complete_job(&self, id: JobId) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'completed', updated_at = NOW() \
             WHERE id = $1 AND status = 'running'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to complete job"))?;
        ensure_settled(id, result.rows_affected())
    }

    async fn fail_job(&self, id: JobId, error: &str) -> AppResult<()> {
        self.settle(
            "UPDATE jobs SET status = 'failed', attempts = attempts + 1, last_error = $2, \
             updated_at = NOW() WHERE id = $1 AND status = 'running'",
            id,
            error,
        )
        .await
    }

    async fn release_job(&self, id: JobId, error: &str) -> AppResult<()> {
        self.settle(
            "UPDATE jobs SET status = 'pending', attempts = attempts + 1, last_error = $2, \
             worker_id = NULL, updated_at = NOW() WHERE id = $1 AND status = 'running'",
            id,
            error,
        )
        .await
    }

    async fn requeue_stale_jobs(&self, claimed_before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'pending', worker_id = NULL, updated_at = NOW() \
             WHERE status = 'running' AND updated_at < $1",
        )
        .bind(claimed_before)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to requeue stale jobs"))?;
        Ok(result.rows_affected())
    }

    async fn purge_finished_jobs(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM jobs WHERE status IN ('completed', 'failed') AND updated_at < $1",
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to purge finished jobs"))?;
        Ok(result.rows_affected())
    }

    async fn count_jobs(&self, status: JobStatus) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("Failed to count jobs"))?;
        Ok(count as u64)
    }
}

fn ensure_settled(id: JobId, rows_affected: u64) -> AppResult<()> {
    if rows_affected == 0 {
        return Err(AppError::conflict(format!("Job {id} is not running")));
    }
    Ok(())
}
