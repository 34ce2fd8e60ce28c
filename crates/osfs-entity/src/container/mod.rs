//! Container registry entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_core::types::ContainerId;

/// What kind of entity owns a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// A research project.
    Project,
    /// A preprint.
    Preprint,
    /// A user's quick-files folder.
    QuickFiles,
}

impl ContainerKind {
    /// Return the kind as a string for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Preprint => "preprint",
            Self::QuickFiles => "quick_files",
        }
    }

    /// Parse the stored representation.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "project" => Ok(Self::Project),
            "preprint" => Ok(Self::Preprint),
            "quick_files" => Ok(Self::QuickFiles),
            other => Err(AppError::validation(format!("Unknown container kind '{other}'"))),
        }
    }
}

impl std::fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An entity that owns root folders. Only its id, kind and storage region
/// matter to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Opaque ownership key.
    pub id: ContainerId,
    /// Project, preprint or quick files.
    pub kind: ContainerKind,
    /// Storage region selector.
    pub region: String,
    /// When the container was first seen.
    pub created_at: DateTime<Utc>,
}

impl Container {
    /// Describe a container first seen now.
    pub fn new(id: ContainerId, kind: ContainerKind, region: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            region: region.into(),
            created_at: Utc::now(),
        }
    }
}
