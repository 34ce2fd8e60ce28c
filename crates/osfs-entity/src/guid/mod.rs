//! Stable external references to nodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use osfs_core::types::NodeId;

use crate::node::{FileNode, TrashedFileNode};

/// Length of a generated guid.
const GUID_LENGTH: usize = 10;

/// A short public reference that keeps pointing at a node across
/// trash and restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guid {
    /// The public key.
    pub guid: String,
    /// The referenced node (live or trashed).
    pub node_id: NodeId,
    /// Whether the referent currently lives in the trash.
    pub trashed: bool,
    /// When the guid was minted.
    pub created_at: DateTime<Utc>,
}

impl Guid {
    /// Mint a fresh guid for a live node.
    pub fn mint(node_id: NodeId) -> Self {
        let mut guid = Uuid::new_v4().simple().to_string();
        guid.truncate(GUID_LENGTH);
        Self {
            guid,
            node_id,
            trashed: false,
            created_at: Utc::now(),
        }
    }
}

/// What a guid resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum GuidReferent {
    /// A live node.
    Live(FileNode),
    /// A deleted node.
    Gone(TrashedFileNode),
}

impl GuidReferent {
    /// Id of the referenced node.
    pub fn node_id(&self) -> NodeId {
        match self {
            Self::Live(node) => node.id,
            Self::Gone(trashed) => trashed.id(),
        }
    }

    /// Whether the referent is deleted.
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Gone(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_is_short_and_unique() {
        let node = NodeId::new();
        let a = Guid::mint(node);
        let b = Guid::mint(node);
        assert_eq!(a.guid.len(), GUID_LENGTH);
        assert_ne!(a.guid, b.guid);
        assert!(!a.trashed);
    }
}
