//! Versions and version links in PostgreSQL.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgExecutor;

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_core::types::{ContainerId, NodeId, VersionId};
use osfs_entity::version::{FileVersion, FileVersionLink};

use super::rows::{LINK_COLUMNS, LinkRow, VERSION_COLUMNS, VersionRow};
use super::{PgStore, commit, db_err};
use crate::store::VersionRepository;

/// Insert a link row as given.
pub(crate) async fn insert_link_row<'e>(
    executor: impl PgExecutor<'e>,
    link: &FileVersionLink,
) -> AppResult<()> {
    sqlx::query(&format!(
        "INSERT INTO file_version_links ({LINK_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
    ))
    .bind(link.file_id)
    .bind(link.version_id)
    .bind(link.identifier)
    .bind(&link.version_name)
    .bind(link.download_count)
    .bind(link.created_at)
    .execute(executor)
    .await
    .map_err(db_err("Failed to insert version link"))?;
    Ok(())
}

#[async_trait]
impl VersionRepository for PgStore {
    async fn attach_new_version(
        &self,
        file_id: NodeId,
        version: &FileVersion,
        version_name: &str,
    ) -> AppResult<FileVersionLink> {
        let mut tx = self.begin().await?;

        // Locking the file row serializes identifier assignment per file.
        let kind: Option<String> =
            sqlx::query_scalar("SELECT kind FROM file_nodes WHERE id = $1 FOR UPDATE")
                .bind(file_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err("Failed to lock file"))?;
        match kind.as_deref() {
            None => return Err(AppError::not_found(format!("File {file_id} not found"))),
            Some("file") => {}
            Some(_) => {
                return Err(
                    AppError::type_mismatch("Folders do not have versions").for_node(file_id)
                );
            }
        }

        sqlx::query(&format!(
            "INSERT INTO file_versions ({VERSION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(version.id)
        .bind(version.location.to_value())
        .bind(Value::Object(version.metadata.clone()))
        .bind(version.size)
        .bind(&version.content_type)
        .bind(&version.md5)
        .bind(&version.sha256)
        .bind(&version.region)
        .bind(version.creator)
        .bind(version.created_at)
        .bind(version.external_modified)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to insert version"))?;

        let row = sqlx::query_as::<_, LinkRow>(&format!(
            "INSERT INTO file_version_links ({LINK_COLUMNS}) \
             SELECT $1, $2, COALESCE(MAX(identifier), 0) + 1, $3, 0, NOW() \
             FROM file_version_links WHERE file_id = $1 \
             RETURNING {LINK_COLUMNS}"
        ))
        .bind(file_id)
        .bind(version.id)
        .bind(version_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err("Failed to link version"))?;

        commit(tx).await?;
        Ok(row.into())
    }

    async fn find_version(&self, id: VersionId) -> AppResult<Option<FileVersion>> {
        Ok(sqlx::query_as::<_, VersionRow>(&format!(
            "SELECT {VERSION_COLUMNS} FROM file_versions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(db_err("Failed to find version"))?
        .map(FileVersion::from))
    }

    async fn find_links(&self, file_id: NodeId) -> AppResult<Vec<FileVersionLink>> {
        let rows = sqlx::query_as::<_, LinkRow>(&format!(
            "SELECT {LINK_COLUMNS} FROM file_version_links WHERE file_id = $1 \
             ORDER BY identifier ASC"
        ))
        .bind(file_id)
        .fetch_all(self.pool())
        .await
        .map_err(db_err("Failed to list version links"))?;
        Ok(rows.into_iter().map(FileVersionLink::from).collect())
    }

    async fn find_link(
        &self,
        file_id: NodeId,
        identifier: i64,
    ) -> AppResult<Option<FileVersionLink>> {
        Ok(sqlx::query_as::<_, LinkRow>(&format!(
            "SELECT {LINK_COLUMNS} FROM file_version_links \
             WHERE file_id = $1 AND identifier = $2"
        ))
        .bind(file_id)
        .bind(identifier)
        .fetch_optional(self.pool())
        .await
        .map_err(db_err("Failed to find version link"))?
        .map(FileVersionLink::from))
    }

    async fn latest_link(&self, file_id: NodeId) -> AppResult<Option<FileVersionLink>> {
        Ok(sqlx::query_as::<_, LinkRow>(&format!(
            "SELECT {LINK_COLUMNS} FROM file_version_links WHERE file_id = $1 \
             ORDER BY identifier DESC LIMIT 1"
        ))
        .bind(file_id)
        .fetch_optional(self.pool())
        .await
        .map_err(db_err("Failed to find latest version link"))?
        .map(FileVersionLink::from))
    }

    async fn count_links(&self, file_id: NodeId) -> AppResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM file_version_links WHERE file_id = $1")
                .bind(file_id)
                .fetch_one(self.pool())
                .await
                .map_err(db_err("Failed to count versions"))?;
        Ok(count as u64)
    }

    async fn update_version_metadata(&self, version: &FileVersion) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE file_versions SET metadata = $2, size = $3, content_type = $4, md5 = $5, \
             sha256 = $6, external_modified = $7 WHERE id = $1",
        )
        .bind(version.id)
        .bind(Value::Object(version.metadata.clone()))
        .bind(version.size)
        .bind(&version.content_type)
        .bind(&version.md5)
        .bind(&version.sha256)
        .bind(version.external_modified)
        .execute(self.pool())
        .await
        .map_err(db_err("Failed to update version metadata"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "Version {} not found",
                version.id
            )));
        }
        Ok(())
    }

    async fn find_archived_by_sha256(
        &self,
        sha256: &str,
        target: &FileVersion,
    ) -> AppResult<Option<FileVersion>> {
        Ok(sqlx::query_as::<_, VersionRow>(&format!(
            "SELECT {VERSION_COLUMNS} FROM file_versions \
             WHERE sha256 = $1 AND id <> $2 AND created_at < $3 \
             AND metadata ? 'archive' AND metadata ? 'vault' \
             ORDER BY created_at ASC LIMIT 1"
        ))
        .bind(sha256)
        .bind(target.id)
        .bind(target.created_at)
        .fetch_optional(self.pool())
        .await
        .map_err(db_err("Failed to find archived version"))?
        .map(FileVersion::from))
    }

    async fn find_unarchived_versions(&self, limit: u64) -> AppResult<Vec<FileVersion>> {
        let rows = sqlx::query_as::<_, VersionRow>(&format!(
            "SELECT {VERSION_COLUMNS} FROM file_versions \
             WHERE sha256 IS NOT NULL AND NOT (metadata ? 'archive' AND metadata ? 'vault') \
             ORDER BY created_at ASC LIMIT $1"
        ))
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await
        .map_err(db_err("Failed to list unarchived versions"))?;
        Ok(rows.into_iter().map(FileVersion::from).collect())
    }

    async fn increment_download(&self, file_id: NodeId, version_id: VersionId) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE file_version_links SET download_count = download_count + 1 \
             WHERE file_id = $1 AND version_id = $2 RETURNING download_count",
        )
        .bind(file_id)
        .bind(version_id)
        .fetch_optional(self.pool())
        .await
        .map_err(db_err("Failed to record download"))?
        .ok_or_else(|| {
            AppError::not_found(format!(
                "Version {version_id} is not linked to file {file_id}"
            ))
        })
    }

    async fn container_usage(&self, container: ContainerId) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(v.size), 0)::BIGINT FROM file_nodes n \
             JOIN file_version_links l ON l.file_id = n.id \
             JOIN file_versions v ON v.id = l.version_id \
             WHERE n.container_id = $1 AND n.kind = 'file'",
        )
        .bind(container)
        .fetch_one(self.pool())
        .await
        .map_err(db_err("Failed to compute container usage"))
    }
}
