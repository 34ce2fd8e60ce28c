//! Serialized representation returned to the request layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use osfs_core::types::{NodeId, UserId};

use super::model::{FileNode, NodeKind};
use super::trashed::TrashedFileNode;
use crate::version::FileVersion;

/// A node as the hook handlers answer it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    /// Node id.
    pub id: NodeId,
    /// Display name.
    pub name: String,
    /// File or folder.
    pub kind: NodeKind,
    /// Provider-relative path (`/<id>` for files, `/<id>/` for folders).
    pub path: String,
    /// Human-readable path.
    pub materialized_path: String,
    /// Storage provider.
    pub provider: String,
    /// Number of versions (files only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_count: Option<u64>,
    /// Size of the latest version in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    /// Checkout holder.
    pub checkout: Option<UserId>,
    /// MD5 of the latest version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
    /// SHA-256 of the latest version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// Externally reported modification time of the latest version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    /// Tags, sorted.
    pub tags: Vec<String>,
    /// Whether the node lives in the trash.
    pub deleted: bool,
}

impl NodeView {
    /// Build a view of a live node. `latest` and `version_count` are
    /// ignored for folders.
    pub fn of(node: &FileNode, latest: Option<&FileVersion>, version_count: u64) -> Self {
        let is_file = node.is_file();
        let latest = latest.filter(|_| is_file);
        Self {
            id: node.id,
            name: node.name.clone(),
            kind: node.kind,
            path: if is_file {
                format!("/{}", node.id)
            } else {
                format!("/{}/", node.id)
            },
            materialized_path: node.materialized_path.clone(),
            provider: node.provider.clone(),
            version_count: is_file.then_some(version_count),
            size: latest.and_then(|v| v.size),
            checkout: node.checkout,
            md5: latest.and_then(|v| v.md5.clone()),
            sha256: latest.and_then(|v| v.sha256.clone()),
            modified: latest.and_then(|v| v.external_modified),
            tags: node.tags.iter().cloned().collect(),
            deleted: false,
        }
    }

    /// Build a view of a trashed node.
    pub fn of_trashed(trashed: &TrashedFileNode) -> Self {
        let mut view = Self::of(&trashed.node, None, 0);
        view.version_count = None;
        view.deleted = true;
        view
    }
}
