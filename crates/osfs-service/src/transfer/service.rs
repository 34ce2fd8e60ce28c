//! Move, rename and copy.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_core::traits::primary::PrimaryFileRegistry;
use osfs_core::types::{ContainerId, NodeId};
use osfs_database::store::Store;
use osfs_entity::node::FileNode;

use super::plan::{alias_links, plan_copy_nodes, plan_move};
use crate::checkout::gate::ensure_unlocked;
use crate::context::RequestContext;
use crate::tree::TreeService;
use crate::tree::service::validate_name;

/// Relocates and duplicates nodes, possibly across containers.
#[derive(Debug, Clone)]
pub struct TransferService {
    /// Persistence.
    store: Arc<dyn Store>,
    /// Node lookups and subtree walks.
    tree: Arc<TreeService>,
    /// Primary-file constraints.
    primary: Arc<dyn PrimaryFileRegistry>,
}

impl TransferService {
    /// Creates a new transfer service.
    pub fn new(
        store: Arc<dyn Store>,
        tree: Arc<TreeService>,
        primary: Arc<dyn PrimaryFileRegistry>,
    ) -> Self {
        Self {
            store,
            tree,
            primary,
        }
    }

    /// Move `node_id` under `dest_parent_id`, optionally renaming it.
    ///
    /// A blank or missing `name` keeps the current one. Sibling names are
    /// not checked. The node, its live descendants, their container and
    /// region tags and the latest version name are updated in one plan,
    /// so either all of it commits or none of it does.
    pub async fn move_under(
        &self,
        ctx: &RequestContext,
        node_id: NodeId,
        dest_parent_id: NodeId,
        name: Option<&str>,
    ) -> AppResult<FileNode> {
        let node = self.tree.get_node(node_id).await?;
        if node.is_root {
            return Err(AppError::validation("Root folders cannot be moved").for_node(node.id));
        }
        let dest = self.tree.get_node(dest_parent_id).await?;
        dest.ensure_folder()?;
        if self.tree.is_self_or_ancestor(node.id, dest.id).await? {
            return Err(AppError::cycle(node.id));
        }
        let name = resolve_name(&node, name)?;

        let descendants = self.tree.descendants(&node).await?;
        let leaves_container = dest.container_id != node.container_id;
        if leaves_container {
            ensure_not_primary(self.primary.as_ref(), &node, &descendants, "move").await?;
        }
        ensure_unlocked(&node, &descendants)?;

        let mut plan = plan_move(&node, &descendants, &dest, &name, Utc::now())?;
        if leaves_container {
            let from = self.region_of(node.container_id).await?;
            let to = self.region_of(dest.container_id).await?;
            if from != to {
                plan.region = Some(to);
            }
        }

        let stored = self.store.apply_move(&plan).await?;
        let moved = stored
            .into_iter()
            .next()
            .ok_or_else(|| AppError::internal("Move plan returned no rows"))?;

        info!(
            node_id = %moved.id,
            parent_id = %dest.id,
            name = %moved.name,
            subtree = plan.updates.len(),
            region = ?plan.region,
            user_id = ?ctx.user_id,
            "Moved node"
        );
        Ok(moved)
    }

    /// Rename a node in place. Roots cannot be renamed.
    pub async fn rename(
        &self,
        ctx: &RequestContext,
        node_id: NodeId,
        name: &str,
    ) -> AppResult<FileNode> {
        validate_name(name)?;
        let node = self.tree.get_node(node_id).await?;
        let parent_id = node
            .parent_id
            .ok_or_else(|| AppError::validation("Root folders cannot be renamed").for_node(node.id))?;
        self.move_under(ctx, node_id, parent_id, Some(name)).await
    }

    /// Copy `node_id` under `dest_parent_id` as a new node. Files share
    /// their version records with the source; folders are copied with
    /// their whole live subtree. The source is never modified, so
    /// checkouts do not block copying.
    pub async fn copy_under(
        &self,
        ctx: &RequestContext,
        node_id: NodeId,
        dest_parent_id: NodeId,
        name: Option<&str>,
    ) -> AppResult<FileNode> {
        let node = self.tree.get_node(node_id).await?;
        if node.is_root {
            return Err(AppError::validation("Root folders cannot be copied").for_node(node.id));
        }
        let dest = self.tree.get_node(dest_parent_id).await?;
        dest.ensure_folder()?;
        let name = resolve_name(&node, name)?;

        let now = Utc::now();
        let descendants = self.tree.descendants(&node).await?;
        let (mut plan, files) = plan_copy_nodes(&node, &descendants, &dest, &name, now)?;
        for (source_id, copy) in &files {
            let links = self.store.find_links(*source_id).await?;
            plan.links.extend(alias_links(&links, copy, now));
        }

        self.store.apply_copy(&plan).await?;
        let copy = plan
            .nodes
            .into_iter()
            .next()
            .ok_or_else(|| AppError::internal("Copy plan has no root"))?;

        info!(
            source_id = %node.id,
            copy_id = %copy.id,
            parent_id = %dest.id,
            nodes = descendants.len() + 1,
            links = plan.links.len(),
            user_id = ?ctx.user_id,
            "Copied node"
        );
        Ok(copy)
    }

    async fn region_of(&self, container: ContainerId) -> AppResult<String> {
        Ok(self
            .store
            .find_container(container)
            .await?
            .map(|c| c.region)
            .unwrap_or_else(|| self.tree.storage().default_region.clone()))
    }
}

/// Fail with `PrimaryFileConstraint` naming the first constrained file.
pub(crate) async fn ensure_not_primary(
    registry: &dyn PrimaryFileRegistry,
    node: &FileNode,
    descendants: &[FileNode],
    verb: &str,
) -> AppResult<()> {
    for file in std::iter::once(node)
        .chain(descendants)
        .filter(|n| n.is_file())
    {
        if let Some(resource) = registry.primary_resource_of(file.id).await? {
            return Err(AppError::primary_file(file.id, resource, verb));
        }
    }
    Ok(())
}

/// A missing or blank destination name keeps the current name.
fn resolve_name(node: &FileNode, name: Option<&str>) -> AppResult<String> {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => {
            validate_name(name)?;
            Ok(name.to_string())
        }
        None => Ok(node.name.clone()),
    }
}
