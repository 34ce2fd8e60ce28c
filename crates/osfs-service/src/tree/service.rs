//! Tree construction, lookup and traversal.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use osfs_core::config::StorageConfig;
use osfs_core::error::{AppError, ErrorKind};
use osfs_core::result::AppResult;
use osfs_core::types::{ContainerId, NodeId, PageRequest, PageResponse};
use osfs_database::store::Store;
use osfs_entity::container::Container;
use osfs_entity::node::path;
use osfs_entity::node::{CreateNode, FileNode, NodeKind, NodeView, TrashedFileNode};

use crate::context::RequestContext;

/// Maintains the per-container trees of files and folders.
#[derive(Debug, Clone)]
pub struct TreeService {
    /// Persistence.
    store: Arc<dyn Store>,
    /// Provider, region and paging defaults.
    storage: StorageConfig,
    /// How often root creation is retried after losing a race.
    conflict_retries: u32,
}

impl TreeService {
    /// Creates a new tree service.
    pub fn new(store: Arc<dyn Store>, storage: StorageConfig, conflict_retries: u32) -> Self {
        Self {
            store,
            storage,
            conflict_retries,
        }
    }

    /// The storage settings this service runs with.
    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    /// Return the root folder of `(container, provider)`, creating it on
    /// first access. Concurrent first accesses converge on one root: the
    /// loser of the insert race re-reads the winner's row.
    pub async fn get_root(&self, container: &Container, provider: Option<&str>) -> AppResult<FileNode> {
        let provider = provider.unwrap_or(&self.storage.default_provider);
        self.store.upsert_container(container).await?;

        for attempt in 0..=self.conflict_retries {
            if let Some(root) = self.store.find_root(container.id, provider).await? {
                return Ok(root);
            }

            let root = CreateNode::root(container.id, provider).into_node(Utc::now());
            match self.store.insert_node(&root).await {
                Ok(root) => {
                    info!(
                        container_id = %container.id,
                        provider = %provider,
                        root_id = %root.id,
                        "Created root folder"
                    );
                    return Ok(root);
                }
                Err(e) if e.is(ErrorKind::Conflict) => {
                    debug!(container_id = %container.id, attempt, "Lost root creation race");
                }
                Err(e) => return Err(e),
            }
        }

        self.store
            .find_root(container.id, provider)
            .await?
            .ok_or_else(|| {
                AppError::conflict(format!(
                    "Could not create the {provider} root of container {}",
                    container.id
                ))
            })
    }

    /// Append a new file under `parent_id`.
    pub async fn append_file(
        &self,
        ctx: &RequestContext,
        parent_id: NodeId,
        name: &str,
    ) -> AppResult<FileNode> {
        self.append(ctx, parent_id, NodeKind::File, name).await
    }

    /// Append a new folder under `parent_id`.
    pub async fn append_folder(
        &self,
        ctx: &RequestContext,
        parent_id: NodeId,
        name: &str,
    ) -> AppResult<FileNode> {
        self.append(ctx, parent_id, NodeKind::Folder, name).await
    }

    /// Sibling names are not checked here; callers wanting uniqueness use
    /// [`Self::find_child_by_name`] first.
    async fn append(
        &self,
        ctx: &RequestContext,
        parent_id: NodeId,
        kind: NodeKind,
        name: &str,
    ) -> AppResult<FileNode> {
        let name = name.trim();
        validate_name(name)?;
        let parent = self.get_node(parent_id).await?;
        parent.ensure_folder()?;

        let node = CreateNode::child_of(&parent, kind, name).into_node(Utc::now());
        let node = self.store.insert_node(&node).await?;

        info!(
            node_id = %node.id,
            parent_id = %parent.id,
            kind = %kind,
            user_id = ?ctx.user_id,
            "Appended node"
        );
        Ok(node)
    }

    /// The live child of `parent_id` named exactly `name`.
    pub async fn find_child_by_name(&self, parent_id: NodeId, name: &str) -> AppResult<FileNode> {
        let parent = self.get_node(parent_id).await?;
        parent.ensure_folder()?;
        self.store
            .find_child_by_name(parent.id, name)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("No child named {name:?} in {}", parent.id))
            })
    }

    /// A live node. Trashed nodes fail with `Gone`, unknown ids with `NotFound`.
    pub async fn get_node(&self, id: NodeId) -> AppResult<FileNode> {
        if let Some(node) = self.store.find_node(id).await? {
            return Ok(node);
        }
        if self.store.find_trashed(id).await?.is_some() {
            return Err(AppError::gone(id));
        }
        Err(AppError::not_found(format!("Node {id} not found")).for_node(id))
    }

    /// A live file.
    pub async fn get_file(&self, id: NodeId) -> AppResult<FileNode> {
        let node = self.get_node(id).await?;
        node.ensure_file()?;
        Ok(node)
    }

    /// A live folder.
    pub async fn get_folder(&self, id: NodeId) -> AppResult<FileNode> {
        let node = self.get_node(id).await?;
        node.ensure_folder()?;
        Ok(node)
    }

    /// A trashed node.
    pub async fn get_trashed(&self, id: NodeId) -> AppResult<TrashedFileNode> {
        self.store
            .find_trashed(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Trashed node {id} not found")).for_node(id))
    }

    /// One page of the live children of a folder.
    pub async fn list_children(
        &self,
        folder_id: NodeId,
        page: PageRequest,
    ) -> AppResult<PageResponse<FileNode>> {
        let folder = self.get_folder(folder_id).await?;
        self.store.find_children(folder.id, page).await
    }

    /// Walk a materialized path such as `/docs/report.pdf` or `/docs/` from
    /// the root of `(container, provider)`.
    pub async fn resolve_path(
        &self,
        container: ContainerId,
        provider: Option<&str>,
        materialized_path: &str,
    ) -> AppResult<FileNode> {
        let provider = provider.unwrap_or(&self.storage.default_provider);
        let mut current = self
            .store
            .find_root(container, provider)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Container {container} has no {provider} root"))
            })?;

        for segment in path::segments(materialized_path) {
            current.ensure_folder()?;
            current = self
                .store
                .find_child_by_name(current.id, segment)
                .await?
                .ok_or_else(|| {
                    AppError::not_found(format!("Path {materialized_path} not found"))
                })?;
        }

        let wants_folder = materialized_path.ends_with('/');
        if wants_folder != current.is_folder() {
            return Err(AppError::type_mismatch(format!(
                "Path {materialized_path} resolves to a {}",
                current.kind
            ))
            .for_node(current.id));
        }
        Ok(current)
    }

    /// Every live descendant of `node`, parents before children.
    ///
    /// Children are fetched one page at a time so a single query never
    /// returns more than `tree_page_size` rows.
    pub async fn descendants(&self, node: &FileNode) -> AppResult<Vec<FileNode>> {
        let mut found = Vec::new();
        if node.is_file() {
            return Ok(found);
        }

        let mut pending = VecDeque::from([node.id]);
        while let Some(folder_id) = pending.pop_front() {
            let mut page = PageRequest::first(self.storage.tree_page_size);
            loop {
                let children = self.store.find_children(folder_id, page).await?;
                for child in children.items {
                    if child.is_folder() {
                        pending.push_back(child.id);
                    }
                    found.push(child);
                }
                if !children.has_next {
                    break;
                }
                page = page.next();
            }
        }
        Ok(found)
    }

    /// Whether `ancestor` is `node` itself or one of its ancestors.
    pub async fn is_self_or_ancestor(&self, ancestor: NodeId, node: NodeId) -> AppResult<bool> {
        if ancestor == node {
            return Ok(true);
        }
        Ok(self.store.find_ancestor_ids(node).await?.contains(&ancestor))
    }

    /// Serialized view of a live node.
    pub async fn view(&self, node: &FileNode) -> AppResult<NodeView> {
        if node.is_folder() {
            return Ok(NodeView::of(node, None, 0));
        }
        let count = self.store.count_links(node.id).await?;
        let latest = match self.store.latest_link(node.id).await? {
            Some(link) => self.store.find_version(link.version_id).await?,
            None => None,
        };
        Ok(NodeView::of(node, latest.as_ref(), count))
    }
}

/// Names are non-empty and cannot contain the path separator.
pub(crate) fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::validation("Name cannot be empty"));
    }
    if name.contains('/') {
        return Err(AppError::validation(format!(
            "Name {name:?} cannot contain '/'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("report.pdf").is_ok());
        assert!(validate_name("  ").is_err());
        assert!(validate_name("a/b").is_err());
    }
}
