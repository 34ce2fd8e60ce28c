//! File node entity model.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_core::types::{ContainerId, NodeId, UserId};

use super::path;

/// Whether a node is a file or a folder. A node never changes kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A leaf carrying a version chain.
    File,
    /// A container of other nodes.
    Folder,
}

impl NodeKind {
    /// Return the kind as a string for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
        }
    }

    /// Parse the stored representation.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "file" => Ok(Self::File),
            "folder" => Ok(Self::Folder),
            other => Err(AppError::internal(format!("Unknown node kind '{other}'"))),
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A live file or folder in a container's tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    /// Stable external identifier.
    pub id: NodeId,
    /// File or folder.
    pub kind: NodeKind,
    /// Display name. Empty for roots.
    pub name: String,
    /// Slash-delimited path from the root; folders end with `/`.
    pub materialized_path: String,
    /// Storage provider that owns this node.
    pub provider: String,
    /// Owning folder, `None` only for roots.
    pub parent_id: Option<NodeId>,
    /// Whether this is the root folder of its (container, provider).
    pub is_root: bool,
    /// The container this node belongs to.
    pub container_id: ContainerId,
    /// User holding the checkout lock. Always `None` for folders.
    pub checkout: Option<UserId>,
    /// Free-form labels.
    pub tags: BTreeSet<String>,
    /// Incremented on every update; used for compare-and-swap writes.
    pub row_version: i64,
    /// When the node was created.
    pub created_at: DateTime<Utc>,
    /// When the node was last modified.
    pub modified_at: DateTime<Utc>,
}

impl FileNode {
    /// Whether this node is a file.
    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    /// Whether this node is a folder.
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    /// Fail with `TypeMismatch` unless this node is a folder.
    pub fn ensure_folder(&self) -> AppResult<()> {
        if self.is_folder() {
            Ok(())
        } else {
            Err(AppError::type_mismatch(format!(
                "Node {} is a file, a folder was expected",
                self.id
            ))
            .for_node(self.id))
        }
    }

    /// Fail with `TypeMismatch` unless this node is a file.
    pub fn ensure_file(&self) -> AppResult<()> {
        if self.is_file() {
            Ok(())
        } else {
            Err(AppError::type_mismatch(format!(
                "Node {} is a folder, a file was expected",
                self.id
            ))
            .for_node(self.id))
        }
    }

    /// Whether the file is checked out by someone.
    pub fn is_checked_out(&self) -> bool {
        self.checkout.is_some()
    }

    /// Materialized path a child with the given name and kind would get.
    pub fn child_path(&self, name: &str, kind: NodeKind) -> String {
        path::child_path(&self.materialized_path, name, kind)
    }
}

/// Data required to create a new node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNode {
    /// File or folder.
    pub kind: NodeKind,
    /// Display name.
    pub name: String,
    /// Owning folder (`None` for a root).
    pub parent_id: Option<NodeId>,
    /// The owning container.
    pub container_id: ContainerId,
    /// Storage provider tag.
    pub provider: String,
    /// Precomputed materialized path.
    pub materialized_path: String,
    /// Whether the node is a root.
    pub is_root: bool,
}

impl CreateNode {
    /// Describe a child of `parent`.
    pub fn child_of(parent: &FileNode, kind: NodeKind, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind,
            materialized_path: parent.child_path(&name, kind),
            name,
            parent_id: Some(parent.id),
            container_id: parent.container_id,
            provider: parent.provider.clone(),
            is_root: false,
        }
    }

    /// Describe the root folder of a (container, provider) pair.
    pub fn root(container_id: ContainerId, provider: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Folder,
            name: String::new(),
            parent_id: None,
            container_id,
            provider: provider.into(),
            materialized_path: "/".to_string(),
            is_root: true,
        }
    }

    /// Materialize the node with a fresh id.
    pub fn into_node(self, now: DateTime<Utc>) -> FileNode {
        FileNode {
            id: NodeId::new(),
            kind: self.kind,
            name: self.name,
            materialized_path: self.materialized_path,
            provider: self.provider,
            parent_id: self.parent_id,
            is_root: self.is_root,
            container_id: self.container_id,
            checkout: None,
            tags: BTreeSet::new(),
            row_version: 1,
            created_at: now,
            modified_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> FileNode {
        CreateNode::root(ContainerId::new(), "osfstorage").into_node(Utc::now())
    }

    #[test]
    fn test_child_of_root_paths() {
        let root = root();
        let folder = CreateNode::child_of(&root, NodeKind::Folder, "Data").into_node(Utc::now());
        let file = CreateNode::child_of(&folder, NodeKind::File, "run.csv").into_node(Utc::now());
        assert_eq!(folder.materialized_path, "/Data/");
        assert_eq!(file.materialized_path, "/Data/run.csv");
        assert_eq!(file.parent_id, Some(folder.id));
        assert_eq!(file.container_id, root.container_id);
    }

    #[test]
    fn test_ensure_kind() {
        let root = root();
        let file = CreateNode::child_of(&root, NodeKind::File, "a.txt").into_node(Utc::now());
        assert!(root.ensure_folder().is_ok());
        let err = file.ensure_folder().unwrap_err();
        assert_eq!(err.kind, osfs_core::ErrorKind::TypeMismatch);
        assert!(root.ensure_file().is_err());
    }

    #[test]
    fn test_kind_round_trip() {
        assert_eq!(NodeKind::parse("folder").unwrap(), NodeKind::Folder);
        assert_eq!(NodeKind::parse("file").unwrap(), NodeKind::File);
        assert!(NodeKind::parse("link").is_err());
    }
}
