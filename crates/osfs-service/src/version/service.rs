//! Version creation, metadata and history.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_core::types::{ContainerId, NodeId, VersionId};
use osfs_database::store::Store;
use osfs_entity::node::FileNode;
use osfs_entity::version::{CreateVersion, FileVersion, FileVersionLink};

use crate::context::RequestContext;
use crate::tasks::{BackgroundTask, BackgroundTasks};
use crate::tree::TreeService;

/// A version as seen through one file: the shared record plus the
/// per-file link carrying identifier, version name and download count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionEntry {
    /// Per-file association.
    pub link: FileVersionLink,
    /// The version record.
    pub version: FileVersion,
}

/// Result of [`VersionService::create_version`].
#[derive(Debug, Clone, PartialEq)]
pub struct VersionOutcome {
    /// The current version after the call.
    pub entry: VersionEntry,
    /// `false` when the upload matched the latest version and was folded into it.
    pub created: bool,
}

/// Records uploads and exposes version history.
#[derive(Debug, Clone)]
pub struct VersionService {
    /// Persistence.
    store: Arc<dyn Store>,
    /// Node lookups.
    tree: Arc<TreeService>,
    /// Deferred archive matching.
    tasks: Arc<dyn BackgroundTasks>,
}

impl VersionService {
    /// Creates a new version service.
    pub fn new(
        store: Arc<dyn Store>,
        tree: Arc<TreeService>,
        tasks: Arc<dyn BackgroundTasks>,
    ) -> Self {
        Self { store, tree, tasks }
    }

    /// Record an upload against `file_id`.
    ///
    /// When the location names the same resource as the latest version
    /// (ignoring the configured ephemeral keys) nothing is written and
    /// the latest version is returned. Otherwise a new version is
    /// appended with the next identifier.
    pub async fn create_version(
        &self,
        ctx: &RequestContext,
        file_id: NodeId,
        input: CreateVersion,
    ) -> AppResult<VersionOutcome> {
        let file = self.tree.get_file(file_id).await?;
        ensure_upload_allowed(ctx, &file)?;

        let ignored = &self.tree.storage().ephemeral_location_keys;
        if let Some(latest) = self.latest_version(file.id).await? {
            if latest.version.location.same_resource(&input.location, ignored) {
                debug!(
                    file_id = %file.id,
                    version_id = %latest.version.id,
                    "Upload matches latest version"
                );
                return Ok(VersionOutcome {
                    entry: latest,
                    created: false,
                });
            }
        }

        let region = self.region_of(file.container_id).await?;
        let version = input.into_version(region, Utc::now());
        let link = self
            .store
            .attach_new_version(file.id, &version, &file.name)
            .await?;

        info!(
            file_id = %file.id,
            version_id = %version.id,
            identifier = link.identifier,
            size = ?version.size,
            "Created version"
        );

        if version.sha256.is_some() && !version.has_archive() {
            let task = BackgroundTask::ArchiveMatch {
                version_id: version.id,
            };
            if let Err(e) = self.tasks.dispatch(task).await {
                warn!(version_id = %version.id, error = %e, "Failed to queue archive match");
            }
        }

        Ok(VersionOutcome {
            entry: VersionEntry { link, version },
            created: true,
        })
    }

    /// Merge `patch` into a version's metadata. The location never changes.
    pub async fn update_metadata(
        &self,
        version_id: VersionId,
        patch: &Map<String, Value>,
    ) -> AppResult<FileVersion> {
        let mut version = self.get_version_record(version_id).await?;
        version.update_metadata(patch);
        self.store.update_version_metadata(&version).await?;
        debug!(version_id = %version_id, keys = patch.len(), "Updated version metadata");
        Ok(version)
    }

    /// History of a file, most recent first.
    pub async fn list_versions(&self, file_id: NodeId) -> AppResult<Vec<VersionEntry>> {
        let file = self.tree.get_file(file_id).await?;
        let links = self.store.find_links(file.id).await?;

        let mut entries = Vec::with_capacity(links.len());
        for link in links {
            let version = self.get_version_record(link.version_id).await?;
            entries.push(VersionEntry { link, version });
        }
        entries.sort_by(|a, b| {
            b.version
                .created_at
                .cmp(&a.version.created_at)
                .then_with(|| b.link.identifier.cmp(&a.link.identifier))
        });
        Ok(entries)
    }

    /// The version with external identifier `identifier` (1-based).
    pub async fn get_version(&self, file_id: NodeId, identifier: i64) -> AppResult<VersionEntry> {
        let file = self.tree.get_file(file_id).await?;
        let link = self
            .store
            .find_link(file.id, identifier)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("File {file_id} has no version {identifier}"))
                    .for_node(file_id)
            })?;
        let version = self.get_version_record(link.version_id).await?;
        Ok(VersionEntry { link, version })
    }

    /// The current version of a file, if it has any.
    pub async fn latest_version(&self, file_id: NodeId) -> AppResult<Option<VersionEntry>> {
        match self.store.latest_link(file_id).await? {
            Some(link) => {
                let version = self.get_version_record(link.version_id).await?;
                Ok(Some(VersionEntry { link, version }))
            }
            None => Ok(None),
        }
    }

    /// The association of `version_id` with `file_id`, carrying the file
    /// name recorded when that version was current.
    pub async fn get_basefilenode_version(
        &self,
        file_id: NodeId,
        version_id: VersionId,
    ) -> AppResult<FileVersionLink> {
        self.store
            .find_links(file_id)
            .await?
            .into_iter()
            .find(|l| l.version_id == version_id)
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "Version {version_id} is not attached to file {file_id}"
                ))
            })
    }

    /// Count one download of version `identifier` through `file_id`.
    pub async fn record_download(&self, file_id: NodeId, identifier: i64) -> AppResult<i64> {
        let entry = self.get_version(file_id, identifier).await?;
        let count = self
            .store
            .increment_download(file_id, entry.version.id)
            .await?;
        debug!(file_id = %file_id, identifier, count, "Recorded download");
        Ok(count)
    }

    /// Sum of the version sizes referenced by the container's live files.
    /// A version shared by two files counts twice.
    pub async fn container_usage(&self, container: ContainerId) -> AppResult<i64> {
        self.store.container_usage(container).await
    }

    pub(crate) async fn get_version_record(&self, id: VersionId) -> AppResult<FileVersion> {
        self.store
            .find_version(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Version {id} not found")))
    }

    pub(crate) fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    async fn region_of(&self, container: ContainerId) -> AppResult<String> {
        Ok(self
            .store
            .find_container(container)
            .await?
            .map(|c| c.region)
            .unwrap_or_else(|| self.tree.storage().default_region.clone()))
    }
}

/// Only the holder of a checkout may upload new versions of the file.
fn ensure_upload_allowed(ctx: &RequestContext, file: &FileNode) -> AppResult<()> {
    match file.checkout {
        Some(holder) if !ctx.is(holder) => Err(AppError::checked_out(file.id, Some(holder.into()))),
        _ => Ok(()),
    }
}
