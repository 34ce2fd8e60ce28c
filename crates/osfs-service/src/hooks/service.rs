//! Hook handlers: validate a payload, run the operation, answer a view.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_core::types::{ContainerId, NodeId, UserId};
use osfs_entity::node::{FileNode, NodeView};
use osfs_entity::version::CreateVersion;

use super::payload::{DeletePayload, Destination, TransferPayload, UploadPayload};
use crate::context::RequestContext;
use crate::transfer::TransferService;
use crate::trash::TrashService;
use crate::tree::TreeService;
use crate::version::VersionService;

/// Answer of the upload hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOutcome {
    /// The file after the upload.
    pub node: NodeView,
    /// Identifier of the current version.
    pub version: i64,
    /// Whether the file was created by this upload.
    pub created_file: bool,
    /// Whether a new version was recorded (`false` for a repeated upload).
    pub created_version: bool,
}

/// Entry points called by the request layer for proxy hooks.
#[derive(Debug, Clone)]
pub struct HookService {
    tree: Arc<TreeService>,
    versions: Arc<VersionService>,
    transfer: Arc<TransferService>,
    trash: Arc<TrashService>,
}

impl HookService {
    /// Creates a new hook service.
    pub fn new(
        tree: Arc<TreeService>,
        versions: Arc<VersionService>,
        transfer: Arc<TransferService>,
        trash: Arc<TrashService>,
    ) -> Self {
        Self {
            tree,
            versions,
            transfer,
            trash,
        }
    }

    /// Move hook.
    pub async fn handle_move(&self, payload: TransferPayload) -> AppResult<NodeView> {
        let (ctx, source, destination) = self.resolve_transfer(&payload).await?;
        let moved = self
            .transfer
            .move_under(&ctx, source.id, parent_id(destination)?, destination.name.as_deref())
            .await?;
        self.tree.view(&moved).await
    }

    /// Copy hook.
    pub async fn handle_copy(&self, payload: TransferPayload) -> AppResult<NodeView> {
        let (ctx, source, destination) = self.resolve_transfer(&payload).await?;
        let copy = self
            .transfer
            .copy_under(&ctx, source.id, parent_id(destination)?, destination.name.as_deref())
            .await?;
        self.tree.view(&copy).await
    }

    /// Delete hook. A missing node id would address the root, which can
    /// never be deleted.
    pub async fn handle_delete(
        &self,
        node_id: Option<&str>,
        payload: DeletePayload,
    ) -> AppResult<NodeView> {
        let node_id = node_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::validation("Deleting the root folder is not allowed"))?;
        let ctx = context_for(payload.user);
        let trashed = self.trash.delete(&ctx, parse_node_id(node_id)?).await?;
        Ok(NodeView::of_trashed(&trashed))
    }

    /// Upload hook: record a version on the file named `payload.name`
    /// under `parent_id`, creating the file first when it does not exist.
    pub async fn handle_upload(
        &self,
        parent_id: NodeId,
        payload: UploadPayload,
    ) -> AppResult<UploadOutcome> {
        payload.validate()?;
        if payload.is_folder() {
            return Err(AppError::type_mismatch("Uploads must describe a file"));
        }
        let ctx = context_for(payload.user);
        let parent = self.tree.get_folder(parent_id).await?;
        let name = payload.name.trim();

        let (file, created_file) = match self.tree.find_child_by_name(parent.id, name).await {
            Ok(existing) => {
                existing.ensure_file()?;
                (existing, false)
            }
            Err(e) if e.is(osfs_core::error::ErrorKind::NotFound) => {
                (self.tree.append_file(&ctx, parent.id, name).await?, true)
            }
            Err(e) => return Err(e),
        };

        let outcome = self
            .versions
            .create_version(
                &ctx,
                file.id,
                CreateVersion {
                    creator: ctx.user_id,
                    location: payload.location(),
                    metadata: payload.version_metadata(),
                },
            )
            .await?;

        info!(
            file_id = %file.id,
            created_file,
            created_version = outcome.created,
            identifier = outcome.entry.link.identifier,
            "Handled upload"
        );
        let file = self.tree.get_file(file.id).await?;
        Ok(UploadOutcome {
            node: self.tree.view(&file).await?,
            version: outcome.entry.link.identifier,
            created_file,
            created_version: outcome.created,
        })
    }

    async fn resolve_transfer<'p>(
        &self,
        payload: &'p TransferPayload,
    ) -> AppResult<(RequestContext, FileNode, &'p Destination)> {
        payload.validate()?;
        let destination = payload
            .destination
            .as_ref()
            .ok_or_else(|| AppError::validation("destination is required"))?;
        destination.validate()?;

        let source = self.tree.get_node(parse_node_id(&payload.source)?).await?;
        ensure_in_container(&source, payload.target, "Source")?;
        let parent = self.tree.get_node(parent_id(destination)?).await?;
        ensure_in_container(&parent, destination.target, "Destination")?;

        Ok((context_for(payload.user), source, destination))
    }
}

fn context_for(user: Option<UserId>) -> RequestContext {
    user.map(RequestContext::user)
        .unwrap_or_else(RequestContext::system)
}

fn parent_id(destination: &Destination) -> AppResult<NodeId> {
    parse_node_id(&destination.parent)
}

/// Ids that are not UUIDs cannot resolve to any node.
fn parse_node_id(raw: &str) -> AppResult<NodeId> {
    raw.trim()
        .parse::<NodeId>()
        .map_err(|_| AppError::not_found(format!("Node {raw} not found")))
}

fn ensure_in_container(
    node: &FileNode,
    expected: Option<ContainerId>,
    role: &str,
) -> AppResult<()> {
    match expected {
        Some(container) if container != node.container_id => Err(AppError::validation(format!(
            "{role} {} does not belong to container {container}",
            node.id
        ))
        .for_node(node.id)),
        _ => Ok(()),
    }
}
