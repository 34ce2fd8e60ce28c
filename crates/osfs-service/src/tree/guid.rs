//! Stable public references.

use std::sync::Arc;

use tracing::info;

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_core::types::NodeId;
use osfs_database::store::Store;
use osfs_entity::guid::{Guid, GuidReferent};

/// Mints guids and resolves them to live or trashed nodes.
#[derive(Debug, Clone)]
pub struct GuidService {
    /// Persistence.
    store: Arc<dyn Store>,
}

impl GuidService {
    /// Creates a new guid service.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The guid of a live node, minting one on first request.
    pub async fn get_or_create_guid(&self, node_id: NodeId) -> AppResult<Guid> {
        if let Some(guid) = self.store.find_guid_for_node(node_id).await? {
            return Ok(guid);
        }
        if self.store.find_node(node_id).await?.is_none() {
            return Err(AppError::not_found(format!("Node {node_id} not found")).for_node(node_id));
        }

        let guid = self.store.insert_guid(&Guid::mint(node_id)).await?;
        info!(node_id = %node_id, guid = %guid.guid, "Minted guid");
        Ok(guid)
    }

    /// What a guid currently points at.
    pub async fn resolve_guid(&self, guid: &str) -> AppResult<GuidReferent> {
        let row = self
            .store
            .find_guid(guid)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Guid {guid} not found")))?;

        if !row.trashed {
            if let Some(node) = self.store.find_node(row.node_id).await? {
                return Ok(GuidReferent::Live(node));
            }
        }
        if let Some(trashed) = self.store.find_trashed(row.node_id).await? {
            return Ok(GuidReferent::Gone(trashed));
        }
        Err(AppError::not_found(format!("Guid {guid} points at nothing")).for_node(row.node_id))
    }
}
