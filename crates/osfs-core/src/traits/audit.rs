//! Audit log sink.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::result::AppResult;
use crate::types::{ContainerId, UserId};

/// One structured audit entry: `{action, target container, user, params}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Action name (`checked_out`, `checked_in`, `file_tag_added`, ...).
    pub action: String,
    /// The container the entry is recorded against.
    pub container_id: ContainerId,
    /// The acting user, `None` for system-initiated transitions.
    pub user_id: Option<UserId>,
    /// Action-specific parameters.
    pub params: serde_json::Value,
    /// When the action happened.
    pub occurred_at: DateTime<Utc>,
}

impl AuditRecord {
    /// Create a record stamped with the current time.
    pub fn new(
        action: impl Into<String>,
        container_id: ContainerId,
        user_id: Option<UserId>,
        params: serde_json::Value,
    ) -> Self {
        Self {
            action: action.into(),
            container_id,
            user_id,
            params,
            occurred_at: Utc::now(),
        }
    }
}

/// Destination for audit entries. The engine calls it after every
/// successful checkout transition, tag mutation and top-level delete.
#[async_trait]
pub trait AuditSink: Send + Sync + std::fmt::Debug + 'static {
    /// Record one entry.
    async fn record(&self, record: AuditRecord) -> AppResult<()>;
}
