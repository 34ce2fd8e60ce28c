//! Free-form tags on files.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_core::types::NodeId;
use osfs_database::store::Store;
use osfs_entity::audit::AuditAction;
use osfs_entity::node::FileNode;

use crate::audit::AuditTrail;
use crate::context::RequestContext;
use crate::tree::TreeService;

/// Adds and removes tags, auditing each actual change.
#[derive(Debug, Clone)]
pub struct TagService {
    store: Arc<dyn Store>,
    tree: Arc<TreeService>,
    audit: AuditTrail,
}

impl TagService {
    /// Creates a new tag service.
    pub fn new(store: Arc<dyn Store>, tree: Arc<TreeService>, audit: AuditTrail) -> Self {
        Self { store, tree, audit }
    }

    /// Add `tag` to a file. Adding a tag the file already has fails with `Duplicate`.
    pub async fn add_tag(
        &self,
        ctx: &RequestContext,
        file_id: NodeId,
        tag: &str,
    ) -> AppResult<FileNode> {
        let tag = normalize(tag)?;
        let file = self.tree.get_file(file_id).await?;
        if file.tags.contains(&tag) {
            return Err(
                AppError::duplicate(format!("File {file_id} is already tagged {tag:?}"))
                    .for_node(file_id),
            );
        }

        let mut updated = file;
        updated.tags.insert(tag.clone());
        updated.modified_at = ctx.request_time;
        let updated = self.store.update_node(&updated).await?;

        info!(file_id = %file_id, tag = %tag, "Added tag");
        self.audit
            .record(ctx, AuditAction::FileTagAdded, &updated, json!({ "tag": tag }))
            .await;
        Ok(updated)
    }

    /// Remove `tag` from a file. Removing an absent tag fails with `NotFound`.
    pub async fn remove_tag(
        &self,
        ctx: &RequestContext,
        file_id: NodeId,
        tag: &str,
    ) -> AppResult<FileNode> {
        let tag = normalize(tag)?;
        let file = self.tree.get_file(file_id).await?;
        if !file.tags.contains(&tag) {
            return Err(
                AppError::not_found(format!("File {file_id} is not tagged {tag:?}"))
                    .for_node(file_id),
            );
        }

        let mut updated = file;
        updated.tags.remove(&tag);
        updated.modified_at = ctx.request_time;
        let updated = self.store.update_node(&updated).await?;

        info!(file_id = %file_id, tag = %tag, "Removed tag");
        self.audit
            .record(ctx, AuditAction::FileTagRemoved, &updated, json!({ "tag": tag }))
            .await;
        Ok(updated)
    }
}

fn normalize(tag: &str) -> AppResult<String> {
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(AppError::validation("Tag cannot be empty"));
    }
    Ok(tag.to_string())
}
