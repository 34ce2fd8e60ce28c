//! Multi-row plans against the in-memory store.
//!
//! Each plan is validated in full under the write lock before the first
//! row changes, so a failing plan leaves the tables untouched.

use std::collections::HashSet;

use async_trait::async_trait;

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_core::types::NodeId;
use osfs_entity::node::FileNode;

use super::MemoryStore;
use crate::store::{CopyPlan, MovePlan, MutationRepository, RestorePlan, TrashPlan};

#[async_trait]
impl MutationRepository for MemoryStore {
    async fn apply_move(&self, plan: &MovePlan) -> AppResult<Vec<FileNode>> {
        let mut state = self.state.write().await;
        let moving: HashSet<NodeId> = plan.updates.iter().map(|n| n.id).collect();
        for node in &plan.updates {
            state.check_row_version(node)?;
            if let Some(parent_id) = node.parent_id {
                if !state.nodes.contains_key(&parent_id) && !moving.contains(&parent_id) {
                    return Err(AppError::not_found(format!("Parent {parent_id} not found")));
                }
            }
        }

        let mut stored = Vec::with_capacity(plan.updates.len());
        for node in &plan.updates {
            let mut row = node.clone();
            row.row_version += 1;
            state.nodes.insert(row.id, row.clone());
            stored.push(row);
        }

        if let Some(region) = &plan.region {
            let version_ids: Vec<_> = plan
                .updates
                .iter()
                .filter(|n| n.is_file())
                .filter_map(|n| state.links.get(&n.id))
                .flatten()
                .map(|l| l.version_id)
                .collect();
            for id in version_ids {
                if let Some(version) = state.versions.get_mut(&id) {
                    version.region = region.clone();
                }
            }
        }

        for (file_id, name) in &plan.version_names {
            if let Some(latest) = state.links.get_mut(file_id).and_then(|l| l.last_mut()) {
                latest.version_name = name.clone();
            }
        }
        Ok(stored)
    }

    async fn apply_copy(&self, plan: &CopyPlan) -> AppResult<()> {
        let mut state = self.state.write().await;
        let mut inserted: HashSet<NodeId> = HashSet::new();
        for node in &plan.nodes {
            if state.nodes.contains_key(&node.id) || state.trashed.contains_key(&node.id) {
                return Err(AppError::conflict(format!("Node {} already exists", node.id)));
            }
            match node.parent_id {
                Some(parent_id)
                    if !state.nodes.contains_key(&parent_id) && !inserted.contains(&parent_id) =>
                {
                    return Err(AppError::not_found(format!("Parent {parent_id} not found")));
                }
                _ => {}
            }
            inserted.insert(node.id);
        }
        for link in &plan.links {
            if !inserted.contains(&link.file_id) {
                return Err(AppError::internal(format!(
                    "Copied link targets {} outside the plan",
                    link.file_id
                )));
            }
            if !state.versions.contains_key(&link.version_id) {
                return Err(AppError::not_found(format!(
                    "Version {} not found",
                    link.version_id
                )));
            }
        }

        for node in &plan.nodes {
            state.nodes.insert(node.id, node.clone());
        }
        for link in &plan.links {
            let links = state.links.entry(link.file_id).or_default();
            links.push(link.clone());
            links.sort_by_key(|l| l.identifier);
        }
        Ok(())
    }

    async fn apply_trash(&self, plan: &TrashPlan) -> AppResult<()> {
        let mut state = self.state.write().await;
        for trashed in &plan.nodes {
            state.check_row_version(&trashed.node)?;
            if trashed.node.is_root {
                return Err(AppError::validation("Root folders cannot be deleted")
                    .for_node(trashed.id()));
            }
        }

        for trashed in &plan.nodes {
            if let Some(live) = state.nodes.remove(&trashed.id()) {
                state.unindex_root(&live);
            }
            state.trashed.insert(trashed.id(), trashed.clone());
        }
        let ids: HashSet<NodeId> = plan.nodes.iter().map(|t| t.id()).collect();
        for guid in state.guids.values_mut() {
            if ids.contains(&guid.node_id) {
                guid.trashed = true;
            }
        }
        Ok(())
    }

    async fn apply_restore(&self, plan: &RestorePlan) -> AppResult<()> {
        let mut state = self.state.write().await;
        let mut restored: HashSet<NodeId> = HashSet::new();
        for node in &plan.nodes {
            if !state.trashed.contains_key(&node.id) {
                return Err(AppError::not_found(format!("Trashed node {} not found", node.id)));
            }
            if state.nodes.contains_key(&node.id) {
                return Err(AppError::conflict(format!("Node {} is already live", node.id)));
            }
            match node.parent_id {
                Some(parent_id)
                    if !state.nodes.contains_key(&parent_id) && !restored.contains(&parent_id) =>
                {
                    return Err(AppError::not_found(format!("Parent {parent_id} not found")));
                }
                _ => {}
            }
            restored.insert(node.id);
        }

        for node in &plan.nodes {
            state.trashed.remove(&node.id);
            state.nodes.insert(node.id, node.clone());
        }
        for guid in state.guids.values_mut() {
            if restored.contains(&guid.node_id) {
                guid.trashed = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NodeRepository, TrashRepository};
    use chrono::Utc;
    use osfs_core::types::ContainerId;
    use osfs_entity::node::{CreateNode, NodeKind, TrashedFileNode};

    async fn tree() -> (MemoryStore, FileNode, FileNode, FileNode) {
        let store = MemoryStore::new();
        let now = Utc::now();
        let root = CreateNode::root(ContainerId::new(), "osfstorage").into_node(now);
        let folder = CreateNode::child_of(&root, NodeKind::Folder, "docs").into_node(now);
        let file = CreateNode::child_of(&folder, NodeKind::File, "a.txt").into_node(now);
        for node in [&root, &folder, &file] {
            store.insert_node(node).await.unwrap();
        }
        (store, root, folder, file)
    }

    #[tokio::test]
    async fn test_stale_move_changes_nothing() {
        let (store, root, folder, file) = tree().await;
        let bumped = store.update_node(&file).await.unwrap();
        assert_eq!(bumped.row_version, file.row_version + 1);

        let mut moved_folder = folder.clone();
        moved_folder.name = "renamed".to_string();
        let mut moved_file = file.clone();
        moved_file.parent_id = Some(root.id);

        let plan = MovePlan {
            updates: vec![moved_folder, moved_file],
            ..MovePlan::default()
        };
        let err = store.apply_move(&plan).await.unwrap_err();
        assert!(err.is(osfs_core::error::ErrorKind::Conflict));
        let folder_now = store.find_node(folder.id).await.unwrap().unwrap();
        assert_eq!(folder_now.name, "docs");
    }

    #[tokio::test]
    async fn test_trash_then_restore_round_trip() {
        let (store, _root, folder, file) = tree().await;
        let now = Utc::now();
        let plan = TrashPlan {
            nodes: vec![
                TrashedFileNode::from_live(folder.clone(), None, now, None),
                TrashedFileNode::from_live(file.clone(), None, now, Some(folder.id)),
            ],
        };
        store.apply_trash(&plan).await.unwrap();
        assert_eq!(store.live_count().await, 1);
        assert_eq!(store.trashed_count().await, 2);
        assert_eq!(store.find_trashed_children(folder.id).await.unwrap().len(), 1);

        let restore = RestorePlan {
            nodes: vec![folder.clone(), file.clone()],
        };
        store.apply_restore(&restore).await.unwrap();
        assert_eq!(store.live_count().await, 3);
        assert_eq!(store.trashed_count().await, 0);
    }

    #[tokio::test]
    async fn test_restore_requires_parent() {
        let (store, _root, folder, file) = tree().await;
        let now = Utc::now();
        store
            .apply_trash(&TrashPlan {
                nodes: vec![
                    TrashedFileNode::from_live(folder.clone(), None, now, None),
                    TrashedFileNode::from_live(file.clone(), None, now, Some(folder.id)),
                ],
            })
            .await
            .unwrap();

        let err = store
            .apply_restore(&RestorePlan {
                nodes: vec![file.clone()],
            })
            .await
            .unwrap_err();
        assert!(err.is(osfs_core::error::ErrorKind::NotFound));
        assert_eq!(store.trashed_count().await, 2);
    }
}
