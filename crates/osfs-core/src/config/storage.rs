//! File-node engine configuration.

use serde::{Deserialize, Serialize};

/// Settings for the file-node tree and version chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Provider tag stamped on nodes created by this engine.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Region assigned to containers registered without one.
    #[serde(default = "default_region")]
    pub default_region: String,
    /// Location keys ignored when deciding whether two versions are duplicates.
    ///
    /// These name the per-upload fields (such as the transfer worker that
    /// handled the upload) that differ between byte-identical uploads.
    #[serde(default = "default_ephemeral_keys")]
    pub ephemeral_location_keys: Vec<String>,
    /// Page size used when walking large subtrees.
    #[serde(default = "default_tree_page_size")]
    pub tree_page_size: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            default_region: default_region(),
            ephemeral_location_keys: default_ephemeral_keys(),
            tree_page_size: default_tree_page_size(),
        }
    }
}

fn default_provider() -> String {
    "osfstorage".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_ephemeral_keys() -> Vec<String> {
    vec!["uname".to_string()]
}

fn default_tree_page_size() -> u64 {
    500
}
