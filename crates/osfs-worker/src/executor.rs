//! Job executor: dispatches jobs to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use osfs_core::error::{AppError, ErrorKind};

use crate::queue::Job;

/// A handler for one job type.
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// The job type this handler processes.
    fn job_type(&self) -> &str;

    /// Run the job, returning an optional result document.
    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError>;
}

/// Error from job execution.
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Permanent failure, do not retry.
    #[error("Permanent job failure: {0}")]
    Permanent(String),

    /// Transient failure, may retry.
    #[error("Transient job failure: {0}")]
    Transient(String),

    /// Engine error, classified by its kind.
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

impl JobExecutionError {
    /// Whether another attempt could succeed.
    ///
    /// Missing or malformed input stays missing; store conflicts and
    /// database failures may clear up.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Permanent(_) => false,
            Self::Transient(_) => true,
            Self::Internal(err) => matches!(
                err.kind,
                ErrorKind::Conflict | ErrorKind::Database | ErrorKind::Internal
            ),
        }
    }
}

/// Routes jobs to the handler registered for their `job_type`.
#[derive(Debug, Default)]
pub struct JobExecutor {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl JobExecutor {
    /// Create an executor without handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for the same type.
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type().to_string();
        tracing::info!(job_type = %job_type, "Registered job handler");
        self.handlers.insert(job_type, handler);
    }

    /// Execute a job through its handler.
    pub async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let handler = self.handlers.get(&job.job_type).ok_or_else(|| {
            JobExecutionError::Permanent(format!(
                "No handler registered for job type '{}'",
                job.job_type
            ))
        })?;

        tracing::info!(
            job_id = %job.id,
            job_type = %job.job_type,
            attempt = job.attempts + 1,
            max_attempts = job.max_attempts,
            "Executing job"
        );
        handler.execute(job).await
    }

    /// Whether a handler is registered for `job_type`.
    pub fn has_handler(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    /// Registered job types, sorted.
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(!JobExecutionError::Permanent("x".into()).is_retryable());
        assert!(JobExecutionError::Transient("x".into()).is_retryable());
        assert!(JobExecutionError::from(AppError::conflict("race")).is_retryable());
        assert!(!JobExecutionError::from(AppError::not_found("gone")).is_retryable());
    }
}
