//! Dispatch of best-effort background work.
//!
//! The engine never waits on these tasks: a failed dispatch is logged and
//! swallowed by the caller. `osfs-worker` provides the queue-backed
//! implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use osfs_core::result::AppResult;
use osfs_core::types::{ContainerId, UserId, VersionId};

/// A unit of deferred work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackgroundTask {
    /// Backfill archive pointers onto a version from a content match.
    ArchiveMatch {
        /// The version lacking archive info.
        version_id: VersionId,
    },
    /// Check in every file `user_id` holds, optionally within one container.
    ReleaseCheckouts {
        /// The user whose checkouts are released.
        user_id: UserId,
        /// Restrict the sweep to one container.
        container_id: Option<ContainerId>,
    },
}

impl BackgroundTask {
    /// Short name used for job rows and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ArchiveMatch { .. } => "archive_match",
            Self::ReleaseCheckouts { .. } => "release_checkouts",
        }
    }
}

/// Sink for [`BackgroundTask`]s.
#[async_trait]
pub trait BackgroundTasks: Send + Sync + std::fmt::Debug + 'static {
    /// Queue a task. Must not block on its execution.
    async fn dispatch(&self, task: BackgroundTask) -> AppResult<()>;
}

/// Drops every task. Used when no worker runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTasks;

#[async_trait]
impl BackgroundTasks for NoopTasks {
    async fn dispatch(&self, task: BackgroundTask) -> AppResult<()> {
        tracing::debug!(task = task.name(), "No worker configured, dropping task");
        Ok(())
    }
}
