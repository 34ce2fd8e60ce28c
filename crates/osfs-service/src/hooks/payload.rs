//! Hook payloads with validation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

use osfs_core::types::{ContainerId, UserId};
use osfs_entity::version::VersionLocation;

/// Body of the move and copy hooks.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransferPayload {
    /// Id of the node to move or copy.
    #[validate(custom(function = "not_blank", message = "source is required"))]
    pub source: String,
    /// Container the source is expected to live in.
    #[serde(default)]
    pub target: Option<ContainerId>,
    /// Acting user.
    #[serde(default)]
    pub user: Option<UserId>,
    /// Where the node goes.
    #[serde(default)]
    pub destination: Option<Destination>,
}

/// Destination block of a move or copy.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Destination {
    /// Id of the destination folder.
    #[validate(custom(function = "not_blank", message = "destination parent is required"))]
    pub parent: String,
    /// Container the destination folder is expected to live in.
    #[serde(default)]
    pub target: Option<ContainerId>,
    /// New name; blank keeps the current one.
    #[serde(default)]
    pub name: Option<String>,
}

/// Body of the delete hook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeletePayload {
    /// Acting user.
    #[serde(default)]
    pub user: Option<UserId>,
}

/// Body of the upload hook.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UploadPayload {
    /// Acting user.
    #[serde(default)]
    pub user: Option<UserId>,
    /// Name of the file under the parent folder.
    #[validate(custom(function = "not_blank", message = "name is required"))]
    pub name: String,
    /// `file` (default) or `folder`.
    #[serde(default)]
    pub kind: Option<String>,
    /// Content hashes (`md5`, `sha256`).
    #[serde(default)]
    pub hashes: Map<String, Value>,
    /// Per-upload worker info, e.g. `uname`.
    #[serde(default)]
    pub worker: Map<String, Value>,
    /// Storage settings: service, bucket and other resource hints.
    #[serde(default)]
    pub settings: Map<String, Value>,
    /// Upload metadata: size, name (object key), modified, content type.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl UploadPayload {
    /// Blob location: settings, then worker info, then the object key
    /// reported in the metadata `name`.
    pub fn location(&self) -> VersionLocation {
        let mut location = self.settings.clone();
        location.extend(self.worker.clone());
        if let Some(object) = self.metadata.get("name") {
            location.insert("object".to_string(), object.clone());
        }
        VersionLocation(location)
    }

    /// Version metadata: the upload metadata with the hashes merged in.
    pub fn version_metadata(&self) -> Map<String, Value> {
        let mut metadata = self.metadata.clone();
        metadata.extend(self.hashes.clone());
        metadata
    }

    /// Whether the payload describes a folder.
    pub fn is_folder(&self) -> bool {
        self.kind.as_deref() == Some("folder")
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_source_is_rejected() {
        let payload: TransferPayload = serde_json::from_value(json!({
            "source": "  ",
            "destination": {"parent": "x"}
        }))
        .unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_blank_destination_name_is_accepted() {
        let payload: TransferPayload = serde_json::from_value(json!({
            "source": "abc",
            "destination": {"parent": "x", "name": ""}
        }))
        .unwrap();
        assert!(payload.validate().is_ok());
        assert!(payload.destination.unwrap().validate().is_ok());
    }

    #[test]
    fn test_upload_location_uses_settings_worker_and_object() {
        let payload: UploadPayload = serde_json::from_value(json!({
            "name": "a.txt",
            "hashes": {"sha256": "ff"},
            "worker": {"uname": "host-1"},
            "settings": {"service": "cloud", "bucket": "b"},
            "metadata": {"name": "ff", "size": 3}
        }))
        .unwrap();

        let location = payload.location();
        assert_eq!(location.service(), Some("cloud"));
        assert_eq!(location.object(), Some("ff"));
        assert_eq!(location.0.get("uname"), Some(&json!("host-1")));
        assert_eq!(payload.version_metadata().get("sha256"), Some(&json!("ff")));
    }
}
