//! File version entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use osfs_core::types::{UserId, VersionId};

use super::location::VersionLocation;

/// Metadata keys that point at long-term cold storage copies.
pub const ARCHIVE_KEY: &str = "archive";
/// Companion key to [`ARCHIVE_KEY`].
pub const VAULT_KEY: &str = "vault";

/// One committed upload. Immutable apart from metadata merges and the
/// one-time archive backfill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileVersion {
    /// Unique version identifier.
    pub id: VersionId,
    /// Where the bytes live.
    pub location: VersionLocation,
    /// Extra key/values: hashes, external modified time, archive pointers.
    pub metadata: Map<String, Value>,
    /// Size in bytes.
    pub size: Option<i64>,
    /// Declared content type.
    pub content_type: Option<String>,
    /// MD5 of the content.
    pub md5: Option<String>,
    /// SHA-256 of the content.
    pub sha256: Option<String>,
    /// Storage region the blob is billed to.
    pub region: String,
    /// Uploading user.
    pub creator: Option<UserId>,
    /// When the version was recorded.
    pub created_at: DateTime<Utc>,
    /// Modification time reported by the storage backend.
    pub external_modified: Option<DateTime<Utc>>,
}

impl FileVersion {
    /// Merge `patch` into the metadata map and mirror the recognized keys
    /// (`size`, `modified`, `md5`, `sha256`) into their attributes.
    /// The location is never touched.
    pub fn update_metadata(&mut self, patch: &Map<String, Value>) {
        for (key, value) in patch {
            self.metadata.insert(key.clone(), value.clone());
            match key.as_str() {
                "size" => {
                    if let Some(size) = parse_size(value) {
                        self.size = Some(size);
                    }
                }
                "modified" => {
                    if let Some(modified) = value
                        .as_str()
                        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    {
                        self.external_modified = Some(modified.with_timezone(&Utc));
                    }
                }
                "md5" => self.md5 = value.as_str().map(str::to_string),
                "sha256" => self.sha256 = value.as_str().map(str::to_string),
                "contentType" | "content_type" => {
                    self.content_type = value.as_str().map(str::to_string)
                }
                _ => {}
            }
        }
    }

    /// Whether the version already carries cold-storage pointers.
    pub fn has_archive(&self) -> bool {
        self.metadata.contains_key(ARCHIVE_KEY) && self.metadata.contains_key(VAULT_KEY)
    }

    /// The `archive`/`vault` pair, if both are present.
    pub fn archive_info(&self) -> Option<Map<String, Value>> {
        if !self.has_archive() {
            return None;
        }
        let mut info = Map::new();
        for key in [ARCHIVE_KEY, VAULT_KEY] {
            if let Some(value) = self.metadata.get(key) {
                info.insert(key.to_string(), value.clone());
            }
        }
        Some(info)
    }
}

fn parse_size(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Data describing an upload to record as a version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVersion {
    /// Uploading user.
    pub creator: Option<UserId>,
    /// Blob location from the transfer proxy.
    pub location: VersionLocation,
    /// Upload metadata (size, hashes, modified, ...).
    pub metadata: Map<String, Value>,
}

impl CreateVersion {
    /// Materialize the version with a fresh id in the given region.
    pub fn into_version(self, region: impl Into<String>, now: DateTime<Utc>) -> FileVersion {
        let mut version = FileVersion {
            id: VersionId::new(),
            location: self.location,
            metadata: Map::new(),
            size: None,
            content_type: None,
            md5: None,
            sha256: None,
            region: region.into(),
            creator: self.creator,
            created_at: now,
            external_modified: None,
        };
        version.update_metadata(&self.metadata);
        version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_update_metadata_sets_recognized_fields() {
        let mut version = CreateVersion {
            creator: None,
            location: VersionLocation::from_value(json!({"service": "cloud", "object": "k"})),
            metadata: object(json!({"size": 10, "sha256": "aa"})),
        }
        .into_version("us-east-1", Utc::now());
        assert_eq!(version.size, Some(10));

        version.update_metadata(&object(json!({
            "size": "1337",
            "md5": "bb",
            "modified": "2024-01-02T03:04:05Z",
            "custom": true,
        })));

        assert_eq!(version.size, Some(1337));
        assert_eq!(version.md5.as_deref(), Some("bb"));
        assert_eq!(version.sha256.as_deref(), Some("aa"));
        assert!(version.external_modified.is_some());
        assert_eq!(version.metadata.get("custom"), Some(&json!(true)));
        assert_eq!(version.location.object(), Some("k"));
    }

    #[test]
    fn test_archive_info_requires_both_keys() {
        let mut version = CreateVersion {
            creator: None,
            location: VersionLocation::default(),
            metadata: object(json!({"archive": "glacier-1"})),
        }
        .into_version("us-east-1", Utc::now());
        assert!(!version.has_archive());
        assert!(version.archive_info().is_none());

        version.update_metadata(&object(json!({"vault": "v"})));
        let info = version.archive_info().expect("archive info");
        assert_eq!(info.len(), 2);
    }
}
