//! Primary-file registries.

use async_trait::async_trait;
use dashmap::DashMap;

use osfs_core::result::AppResult;
use osfs_core::traits::primary::PrimaryFileRegistry;
use osfs_core::types::NodeId;

/// Registry in which no file is ever primary.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrimaryFiles;

#[async_trait]
impl PrimaryFileRegistry for NoPrimaryFiles {
    async fn primary_resource_of(&self, _node_id: NodeId) -> AppResult<Option<String>> {
        Ok(None)
    }
}

/// Registry kept in process memory, keyed by node id.
#[derive(Debug, Default)]
pub struct InMemoryPrimaryFiles {
    entries: DashMap<NodeId, String>,
}

impl InMemoryPrimaryFiles {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `node_id` as the primary file of `resource`.
    pub fn designate(&self, node_id: NodeId, resource: impl Into<String>) {
        self.entries.insert(node_id, resource.into());
    }

    /// Remove the designation of `node_id`.
    pub fn release(&self, node_id: NodeId) {
        self.entries.remove(&node_id);
    }
}

#[async_trait]
impl PrimaryFileRegistry for InMemoryPrimaryFiles {
    async fn primary_resource_of(&self, node_id: NodeId) -> AppResult<Option<String>> {
        Ok(self.entries.get(&node_id).map(|r| r.value().clone()))
    }
}
