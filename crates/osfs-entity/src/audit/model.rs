//! Audit log entry entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use osfs_core::traits::audit::AuditRecord;
use osfs_core::types::{AuditLogId, ContainerId, UserId};

/// Actions the engine records against a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A file was checked out.
    CheckedOut,
    /// A file was checked in.
    CheckedIn,
    /// A tag was added to a file.
    FileTagAdded,
    /// A tag was removed from a file.
    FileTagRemoved,
    /// A file or folder was moved to the trash.
    FileRemoved,
    /// A trashed file or folder was restored.
    FileRestored,
}

impl AuditAction {
    /// The action name written to the log.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckedOut => "checked_out",
            Self::CheckedIn => "checked_in",
            Self::FileTagAdded => "file_tag_added",
            Self::FileTagRemoved => "file_tag_removed",
            Self::FileRemoved => "file_removed",
            Self::FileRestored => "file_restored",
        }
    }

    /// Build a sink record for this action.
    pub fn record(
        &self,
        container_id: ContainerId,
        user_id: Option<UserId>,
        params: serde_json::Value,
    ) -> AuditRecord {
        AuditRecord::new(self.as_str(), container_id, user_id, params)
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Unique audit entry identifier.
    pub id: AuditLogId,
    /// Action name.
    pub action: String,
    /// Container the entry is recorded against.
    pub container_id: ContainerId,
    /// Acting user.
    pub user_id: Option<UserId>,
    /// Action parameters (JSON).
    pub params: serde_json::Value,
    /// When the action occurred.
    pub created_at: DateTime<Utc>,
}

impl From<AuditRecord> for AuditLogEntry {
    fn from(record: AuditRecord) -> Self {
        Self {
            id: AuditLogId::new(),
            action: record.action,
            container_id: record.container_id,
            user_id: record.user_id,
            params: record.params,
            created_at: record.occurred_at,
        }
    }
}
