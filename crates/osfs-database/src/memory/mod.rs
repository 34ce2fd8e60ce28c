//! In-process store.
//!
//! All tables live behind one `tokio::sync::RwLock`, so every trait method
//! (and in particular every mutation plan) observes and produces a single
//! consistent snapshot. Download counters are kept outside the lock in a
//! `DashMap` since they are hot and never part of a plan.

mod audit;
mod jobs;
mod mutations;
mod nodes;
mod versions;

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_core::types::{ContainerId, NodeId, VersionId};
use osfs_entity::container::Container;
use osfs_entity::guid::Guid;
use osfs_entity::node::{FileNode, TrashedFileNode};
use osfs_entity::version::{FileVersion, FileVersionLink};

pub use audit::MemoryAuditLog;
pub use jobs::MemoryJobStore;

/// Tables of the in-memory store.
#[derive(Debug, Default)]
pub(crate) struct MemoryState {
    pub(crate) containers: HashMap<ContainerId, Container>,
    pub(crate) nodes: HashMap<NodeId, FileNode>,
    /// Unique (container, provider) → root id.
    pub(crate) roots: HashMap<(ContainerId, String), NodeId>,
    pub(crate) trashed: HashMap<NodeId, TrashedFileNode>,
    pub(crate) versions: HashMap<VersionId, FileVersion>,
    /// Links per file, ascending identifier.
    pub(crate) links: HashMap<NodeId, Vec<FileVersionLink>>,
    pub(crate) guids: HashMap<String, Guid>,
}

impl MemoryState {
    /// Fail with `Conflict` unless the stored row still has the version the
    /// caller read.
    pub(crate) fn check_row_version(&self, node: &FileNode) -> AppResult<&FileNode> {
        let stored = self
            .nodes
            .get(&node.id)
            .ok_or_else(|| AppError::not_found(format!("Node {} not found", node.id)))?;
        if stored.row_version != node.row_version {
            return Err(AppError::conflict(format!(
                "Node {} was modified concurrently (expected row version {}, found {})",
                node.id, node.row_version, stored.row_version
            ))
            .for_node(node.id));
        }
        Ok(stored)
    }

    /// Register a node in the root index if it is a root.
    pub(crate) fn index_root(&mut self, node: &FileNode) -> AppResult<()> {
        if !node.is_root {
            return Ok(());
        }
        let key = (node.container_id, node.provider.clone());
        if let Some(existing) = self.roots.get(&key) {
            if *existing != node.id {
                return Err(AppError::conflict(format!(
                    "Container {} already has a {} root",
                    node.container_id, node.provider
                )));
            }
        }
        self.roots.insert(key, node.id);
        Ok(())
    }

    /// Remove a node from the root index.
    pub(crate) fn unindex_root(&mut self, node: &FileNode) {
        if node.is_root {
            self.roots.remove(&(node.container_id, node.provider.clone()));
        }
    }
}

/// Store keeping every table in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub(crate) state: Arc<RwLock<MemoryState>>,
    pub(crate) downloads: Arc<DashMap<(NodeId, VersionId), i64>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub async fn live_count(&self) -> usize {
        self.state.read().await.nodes.len()
    }

    /// Number of trashed nodes.
    pub async fn trashed_count(&self) -> usize {
        self.state.read().await.trashed.len()
    }

    /// Number of distinct version records.
    pub async fn version_count(&self) -> usize {
        self.state.read().await.versions.len()
    }

    pub(crate) fn with_downloads(&self, mut link: FileVersionLink) -> FileVersionLink {
        if let Some(count) = self.downloads.get(&(link.file_id, link.version_id)) {
            link.download_count = *count;
        }
        link
    }
}
