//! Converting subtrees between live and trashed rows.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_core::traits::primary::PrimaryFileRegistry;
use osfs_core::types::{ContainerId, NodeId, PageRequest, PageResponse};
use osfs_database::store::{RestorePlan, Store, TrashPlan};
use osfs_entity::audit::AuditAction;
use osfs_entity::node::{FileNode, TrashedFileNode, path};

use crate::audit::AuditTrail;
use crate::checkout::gate::ensure_unlocked;
use crate::context::RequestContext;
use crate::transfer::service::ensure_not_primary;
use crate::tree::TreeService;

/// Deletes subtrees into the trash and restores them.
#[derive(Debug, Clone)]
pub struct TrashService {
    /// Persistence.
    store: Arc<dyn Store>,
    /// Node lookups and subtree walks.
    tree: Arc<TreeService>,
    /// Primary-file constraints.
    primary: Arc<dyn PrimaryFileRegistry>,
    /// One entry per delete and restore call.
    audit: AuditTrail,
}

impl TrashService {
    /// Creates a new trash service.
    pub fn new(
        store: Arc<dyn Store>,
        tree: Arc<TreeService>,
        primary: Arc<dyn PrimaryFileRegistry>,
        audit: AuditTrail,
    ) -> Self {
        Self {
            store,
            tree,
            primary,
            audit,
        }
    }

    /// Trash `node_id` and every live descendant.
    ///
    /// Blocked as a whole when any file in the subtree is checked out or
    /// is a primary file. Trashed rows keep their ids, and guids pointing
    /// at them resolve to the trashed rows afterwards.
    pub async fn delete(&self, ctx: &RequestContext, node_id: NodeId) -> AppResult<TrashedFileNode> {
        let node = self.tree.get_node(node_id).await?;
        if node.is_root {
            return Err(AppError::validation("Root folders cannot be deleted").for_node(node.id));
        }

        let descendants = self.tree.descendants(&node).await?;
        ensure_unlocked(&node, &descendants)?;
        ensure_not_primary(self.primary.as_ref(), &node, &descendants, "delete").await?;

        let now = ctx.request_time;
        let mut plan = TrashPlan {
            nodes: Vec::with_capacity(descendants.len() + 1),
        };
        plan.nodes
            .push(TrashedFileNode::from_live(node.clone(), ctx.user_id, now, None));
        for child in descendants {
            let trashed_parent = child.parent_id;
            plan.nodes
                .push(TrashedFileNode::from_live(child, ctx.user_id, now, trashed_parent));
        }

        self.store.apply_trash(&plan).await?;
        info!(
            node_id = %node.id,
            trashed = plan.nodes.len(),
            user_id = ?ctx.user_id,
            "Trashed subtree"
        );
        self.audit
            .record(
                ctx,
                AuditAction::FileRemoved,
                &node,
                json!({ "trashed": plan.nodes.len() }),
            )
            .await;

        plan.nodes
            .into_iter()
            .next()
            .ok_or_else(|| AppError::internal("Trash plan has no root"))
    }

    /// Restore a trashed node together with everything trashed with it
    /// beneath it. The node goes back under its former parent when that
    /// parent is live, otherwise under the root of its container.
    pub async fn restore(&self, ctx: &RequestContext, node_id: NodeId) -> AppResult<FileNode> {
        if self.store.find_node(node_id).await?.is_some() {
            return Err(
                AppError::duplicate(format!("Node {node_id} is not in the trash")).for_node(node_id)
            );
        }
        let top = self.tree.get_trashed(node_id).await?;
        let parent = self.restore_target(&top).await?;

        let old_prefix = top.node.materialized_path.clone();
        let new_prefix = parent.child_path(&top.node.name, top.node.kind);

        let mut restored = top.node.clone();
        restored.parent_id = Some(parent.id);
        restored.materialized_path = new_prefix.clone();
        restored.container_id = parent.container_id;
        let mut plan = RestorePlan {
            nodes: vec![restored],
        };

        let mut pending = VecDeque::from([top.id()]);
        while let Some(id) = pending.pop_front() {
            for child in self.store.find_trashed_children(id).await? {
                pending.push_back(child.id());
                let mut node = child.node;
                node.materialized_path =
                    path::rebase(&node.materialized_path, &old_prefix, &new_prefix)
                        .unwrap_or_else(|| {
                            warn!(node_id = %node.id, "Trashed path outside its parent, recomputing");
                            path::child_path(&new_prefix, &node.name, node.kind)
                        });
                node.container_id = parent.container_id;
                plan.nodes.push(node);
            }
        }

        self.store.apply_restore(&plan).await?;
        info!(
            node_id = %node_id,
            parent_id = %parent.id,
            restored = plan.nodes.len(),
            user_id = ?ctx.user_id,
            "Restored subtree"
        );

        let node = plan
            .nodes
            .into_iter()
            .next()
            .ok_or_else(|| AppError::internal("Restore plan has no root"))?;
        self.audit
            .record(ctx, AuditAction::FileRestored, &node, json!({}))
            .await;
        Ok(node)
    }

    /// One page of a container's trash, most recently deleted first.
    pub async fn list_trash(
        &self,
        container: ContainerId,
        page: PageRequest,
    ) -> AppResult<PageResponse<TrashedFileNode>> {
        self.store.list_trashed(container, page).await
    }

    async fn restore_target(&self, top: &TrashedFileNode) -> AppResult<FileNode> {
        if let Some(parent_id) = top.node.parent_id {
            if let Some(parent) = self.store.find_node(parent_id).await? {
                if parent.is_folder() {
                    return Ok(parent);
                }
            }
        }
        self.store
            .find_root(top.node.container_id, &top.node.provider)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "Container {} has no {} root to restore into",
                    top.node.container_id, top.node.provider
                ))
            })
    }
}
