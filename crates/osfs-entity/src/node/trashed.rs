//! Soft-deleted shadow of a file node.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use osfs_core::types::{NodeId, UserId};

use super::model::FileNode;

/// A node that was deleted. Keeps the live node's id and attributes so
/// that references resolve to a "gone" state and `restore` can rebuild it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrashedFileNode {
    /// The node as it was when deleted.
    #[serde(flatten)]
    pub node: FileNode,
    /// When it was deleted.
    pub deleted_on: DateTime<Utc>,
    /// Who deleted it.
    pub deleted_by: Option<UserId>,
    /// Parent trashed in the same delete operation, if any.
    pub trashed_parent_id: Option<NodeId>,
}

impl TrashedFileNode {
    /// Wrap a live node being deleted.
    pub fn from_live(
        node: FileNode,
        deleted_by: Option<UserId>,
        deleted_on: DateTime<Utc>,
        trashed_parent_id: Option<NodeId>,
    ) -> Self {
        Self {
            node,
            deleted_on,
            deleted_by,
            trashed_parent_id,
        }
    }

    /// The stable id shared with the former live node.
    pub fn id(&self) -> NodeId {
        self.node.id
    }
}
