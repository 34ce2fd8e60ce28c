//! Persisted background jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_core::types::JobId;

/// Lifecycle of a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for a worker.
    Pending,
    /// Claimed by a worker.
    Running,
    /// Finished successfully.
    Completed,
    /// Gave up after a permanent error or the last attempt.
    Failed,
}

impl JobStatus {
    /// Return the status as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse a stored status.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(AppError::internal(format!("Unknown job status '{other}'"))),
        }
    }

    /// Whether the job will never run again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit of background work. Rows survive restarts, so a job queued
/// before shutdown runs after the next start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Job identifier.
    pub id: JobId,
    /// Handler key, e.g. `"archive_match"`.
    pub job_type: String,
    /// Handler input.
    pub payload: Value,
    /// Current status.
    pub status: JobStatus,
    /// Attempts that already failed.
    pub attempts: i32,
    /// Attempts allowed before the job fails for good.
    pub max_attempts: i32,
    /// Error of the most recent failed attempt.
    pub last_error: Option<String>,
    /// Worker holding the job while it runs.
    pub worker_id: Option<String>,
    /// When the job was queued.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A new pending job.
    pub fn new(job_type: impl Into<String>, payload: Value, max_attempts: i32) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            job_type: job_type.into(),
            payload,
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: max_attempts.max(1),
            last_error: None,
            worker_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a failure of the running attempt still leaves another one.
    pub fn has_attempts_left(&self) -> bool {
        self.attempts + 1 < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(JobStatus::parse("queued").is_err());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn test_attempt_budget() {
        let mut job = Job::new("archive_match", Value::Null, 2);
        assert!(job.has_attempts_left());
        job.attempts = 1;
        assert!(!job.has_attempts_left());
        assert_eq!(Job::new("x", Value::Null, 0).max_attempts, 1);
    }
}
