//! Row shapes returned by queries and their conversion into entities.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;

use osfs_core::error::AppError;
use osfs_core::types::{AuditLogId, ContainerId, JobId, NodeId, UserId, VersionId};
use osfs_entity::audit::AuditLogEntry;
use osfs_entity::container::{Container, ContainerKind};
use osfs_entity::guid::Guid;
use osfs_entity::job::{Job, JobStatus};
use osfs_entity::node::{FileNode, NodeKind, TrashedFileNode};
use osfs_entity::version::{FileVersion, FileVersionLink, VersionLocation};

/// Columns shared by `file_nodes` and `trashed_file_nodes`.
pub(crate) const NODE_COLUMNS: &str = "id, kind, name, materialized_path, provider, parent_id, \
     is_root, container_id, checkout, tags, row_version, created_at, modified_at";

/// Columns of `trashed_file_nodes`.
pub(crate) const TRASHED_COLUMNS: &str = "id, kind, name, materialized_path, provider, parent_id, \
     is_root, container_id, checkout, tags, row_version, created_at, modified_at, \
     deleted_on, deleted_by, trashed_parent_id";

/// Columns of `file_versions`.
pub(crate) const VERSION_COLUMNS: &str = "id, location, metadata, size, content_type, md5, \
     sha256, region, creator, created_at, external_modified";

/// Columns of `jobs`.
pub(crate) const JOB_COLUMNS: &str = "id, job_type, payload, status, attempts, max_attempts, \
     last_error, worker_id, created_at, updated_at";

/// Columns of `file_version_links`.
pub(crate) const LINK_COLUMNS: &str =
    "file_id, version_id, identifier, version_name, download_count, created_at";

#[derive(Debug, FromRow)]
pub(crate) struct NodeRow {
    pub id: NodeId,
    pub kind: String,
    pub name: String,
    pub materialized_path: String,
    pub provider: String,
    pub parent_id: Option<NodeId>,
    pub is_root: bool,
    pub container_id: ContainerId,
    pub checkout: Option<UserId>,
    pub tags: Vec<String>,
    pub row_version: i64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl TryFrom<NodeRow> for FileNode {
    type Error = AppError;

    fn try_from(row: NodeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            kind: NodeKind::parse(&row.kind)?,
            name: row.name,
            materialized_path: row.materialized_path,
            provider: row.provider,
            parent_id: row.parent_id,
            is_root: row.is_root,
            container_id: row.container_id,
            checkout: row.checkout,
            tags: row.tags.into_iter().collect(),
            row_version: row.row_version,
            created_at: row.created_at,
            modified_at: row.modified_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct TrashedRow {
    #[sqlx(flatten)]
    pub node: NodeRow,
    pub deleted_on: DateTime<Utc>,
    pub deleted_by: Option<UserId>,
    pub trashed_parent_id: Option<NodeId>,
}

impl TryFrom<TrashedRow> for TrashedFileNode {
    type Error = AppError;

    fn try_from(row: TrashedRow) -> Result<Self, Self::Error> {
        Ok(Self::from_live(
            FileNode::try_from(row.node)?,
            row.deleted_by,
            row.deleted_on,
            row.trashed_parent_id,
        ))
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct VersionRow {
    pub id: VersionId,
    pub location: Value,
    pub metadata: Value,
    pub size: Option<i64>,
    pub content_type: Option<String>,
    pub md5: Option<String>,
    pub sha256: Option<String>,
    pub region: String,
    pub creator: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub external_modified: Option<DateTime<Utc>>,
}

impl From<VersionRow> for FileVersion {
    fn from(row: VersionRow) -> Self {
        Self {
            id: row.id,
            location: VersionLocation::from_value(row.location),
            metadata: match row.metadata {
                Value::Object(map) => map,
                _ => Default::default(),
            },
            size: row.size,
            content_type: row.content_type,
            md5: row.md5,
            sha256: row.sha256,
            region: row.region,
            creator: row.creator,
            created_at: row.created_at,
            external_modified: row.external_modified,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct LinkRow {
    pub file_id: NodeId,
    pub version_id: VersionId,
    pub identifier: i64,
    pub version_name: String,
    pub download_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<LinkRow> for FileVersionLink {
    fn from(row: LinkRow) -> Self {
        Self {
            file_id: row.file_id,
            version_id: row.version_id,
            identifier: row.identifier,
            version_name: row.version_name,
            download_count: row.download_count,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ContainerRow {
    pub id: ContainerId,
    pub kind: String,
    pub region: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ContainerRow> for Container {
    type Error = AppError;

    fn try_from(row: ContainerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            kind: ContainerKind::parse(&row.kind)?,
            region: row.region,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct GuidRow {
    pub guid: String,
    pub node_id: NodeId,
    pub trashed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<GuidRow> for Guid {
    fn from(row: GuidRow) -> Self {
        Self {
            guid: row.guid,
            node_id: row.node_id,
            trashed: row.trashed,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct AuditRow {
    pub id: AuditLogId,
    pub action: String,
    pub container_id: ContainerId,
    pub user_id: Option<UserId>,
    pub params: Value,
    pub created_at: DateTime<Utc>,
}

impl From<AuditRow> for AuditLogEntry {
    fn from(row: AuditRow) -> Self {
        Self {
            id: row.id,
            action: row.action,
            container_id: row.container_id,
            user_id: row.user_id,
            params: row.params,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct JobRow {
    pub id: JobId,
    pub job_type: String,
    pub payload: Value,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub worker_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = AppError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            job_type: row.job_type,
            payload: row.payload,
            status: JobStatus::parse(&row.status)?,
            attempts: row.attempts,
            max_attempts: row.max_attempts,
            last_error: row.last_error,
            worker_id: row.worker_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Convert a batch of fallible rows.
pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, AppError>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}
