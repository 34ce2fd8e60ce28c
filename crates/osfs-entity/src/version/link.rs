//! Association between a file node and one of its versions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use osfs_core::types::{NodeId, VersionId};

/// Per-(file, version) row. Carries the 1-based identifier used in
/// external version URLs and the file name at the time the version was
/// attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileVersionLink {
    /// The file node.
    pub file_id: NodeId,
    /// The version record.
    pub version_id: VersionId,
    /// Position in the file's history, starting at 1.
    pub identifier: i64,
    /// The file's name when this version was current.
    pub version_name: String,
    /// Number of recorded downloads of this version through this file.
    pub download_count: i64,
    /// When the version was attached to the file.
    pub created_at: DateTime<Utc>,
}
