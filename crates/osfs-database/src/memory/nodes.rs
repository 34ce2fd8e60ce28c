//! Container, node, trash and guid tables of the in-memory store.

use async_trait::async_trait;

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_core::types::{ContainerId, NodeId, PageRequest, PageResponse, UserId};
use osfs_entity::container::Container;
use osfs_entity::guid::Guid;
use osfs_entity::node::{FileNode, TrashedFileNode};

use super::MemoryStore;
use crate::store::{ContainerRepository, GuidRepository, NodeRepository, TrashRepository};

#[async_trait]
impl ContainerRepository for MemoryStore {
    async fn upsert_container(&self, container: &Container) -> AppResult<Container> {
        let mut state = self.state.write().await;
        Ok(state
            .containers
            .entry(container.id)
            .or_insert_with(|| container.clone())
            .clone())
    }

    async fn find_container(&self, id: ContainerId) -> AppResult<Option<Container>> {
        Ok(self.state.read().await.containers.get(&id).cloned())
    }
}

#[async_trait]
impl NodeRepository for MemoryStore {
    async fn find_node(&self, id: NodeId) -> AppResult<Option<FileNode>> {
        Ok(self.state.read().await.nodes.get(&id).cloned())
    }

    async fn find_root(
        &self,
        container: ContainerId,
        provider: &str,
    ) -> AppResult<Option<FileNode>> {
        let state = self.state.read().await;
        Ok(state
            .roots
            .get(&(container, provider.to_string()))
            .and_then(|id| state.nodes.get(id))
            .cloned())
    }

    async fn insert_node(&self, node: &FileNode) -> AppResult<FileNode> {
        let mut state = self.state.write().await;
        if state.nodes.contains_key(&node.id) || state.trashed.contains_key(&node.id) {
            return Err(AppError::conflict(format!("Node {} already exists", node.id)));
        }
        if let Some(parent_id) = node.parent_id {
            if !state.nodes.contains_key(&parent_id) {
                return Err(AppError::not_found(format!("Parent {parent_id} not found")));
            }
        }
        state.index_root(node)?;
        state.nodes.insert(node.id, node.clone());
        Ok(node.clone())
    }

    async fn update_node(&self, node: &FileNode) -> AppResult<FileNode> {
        let mut state = self.state.write().await;
        state.check_row_version(node)?;
        let mut stored = node.clone();
        stored.row_version += 1;
        state.nodes.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_children(
        &self,
        parent: NodeId,
        page: PageRequest,
    ) -> AppResult<PageResponse<FileNode>> {
        let state = self.state.read().await;
        let mut children: Vec<FileNode> = state
            .nodes
            .values()
            .filter(|n| n.parent_id == Some(parent))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.0.cmp(&b.id.0)));
        Ok(PageResponse::from_all(children, page))
    }

    async fn find_child_by_name(&self, parent: NodeId, name: &str) -> AppResult<Option<FileNode>> {
        let state = self.state.read().await;
        Ok(state
            .nodes
            .values()
            .filter(|n| n.parent_id == Some(parent) && n.name == name)
            .min_by_key(|n| n.created_at)
            .cloned())
    }

    async fn find_ancestor_ids(&self, id: NodeId) -> AppResult<Vec<NodeId>> {
        let state = self.state.read().await;
        let mut ancestors = Vec::new();
        let mut current = state.nodes.get(&id).and_then(|n| n.parent_id);
        while let Some(parent_id) = current {
            if ancestors.contains(&parent_id) {
                return Err(AppError::internal(format!(
                    "Parent chain of {id} loops through {parent_id}"
                )));
            }
            ancestors.push(parent_id);
            current = state.nodes.get(&parent_id).and_then(|n| n.parent_id);
        }
        Ok(ancestors)
    }

    async fn find_checked_out_by(
        &self,
        user: UserId,
        container: Option<ContainerId>,
    ) -> AppResult<Vec<FileNode>> {
        let state = self.state.read().await;
        Ok(state
            .nodes
            .values()
            .filter(|n| n.checkout == Some(user))
            .filter(|n| container.is_none_or(|c| n.container_id == c))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TrashRepository for MemoryStore {
    async fn find_trashed(&self, id: NodeId) -> AppResult<Option<TrashedFileNode>> {
        Ok(self.state.read().await.trashed.get(&id).cloned())
    }

    async fn find_trashed_children(&self, id: NodeId) -> AppResult<Vec<TrashedFileNode>> {
        let state = self.state.read().await;
        let mut children: Vec<TrashedFileNode> = state
            .trashed
            .values()
            .filter(|t| t.trashed_parent_id == Some(id))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.node.name.cmp(&b.node.name));
        Ok(children)
    }

    async fn list_trashed(
        &self,
        container: ContainerId,
        page: PageRequest,
    ) -> AppResult<PageResponse<TrashedFileNode>> {
        let state = self.state.read().await;
        let mut items: Vec<TrashedFileNode> = state
            .trashed
            .values()
            .filter(|t| t.node.container_id == container)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.deleted_on.cmp(&a.deleted_on));
        Ok(PageResponse::from_all(items, page))
    }
}

#[async_trait]
impl GuidRepository for MemoryStore {
    async fn find_guid(&self, guid: &str) -> AppResult<Option<Guid>> {
        Ok(self.state.read().await.guids.get(guid).cloned())
    }

    async fn find_guid_for_node(&self, node_id: NodeId) -> AppResult<Option<Guid>> {
        let state = self.state.read().await;
        Ok(state.guids.values().find(|g| g.node_id == node_id).cloned())
    }

    async fn insert_guid(&self, guid: &Guid) -> AppResult<Guid> {
        let mut state = self.state.write().await;
        if state.guids.contains_key(&guid.guid) {
            return Err(AppError::conflict(format!("Guid {} already exists", guid.guid)));
        }
        if let Some(existing) = state.guids.values().find(|g| g.node_id == guid.node_id) {
            return Ok(existing.clone());
        }
        state.guids.insert(guid.guid.clone(), guid.clone());
        Ok(guid.clone())
    }
}
