//! Audit sink writing to the `audit_log` table.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::warn;

use osfs_core::result::AppResult;
use osfs_core::traits::audit::{AuditRecord, AuditSink};
use osfs_core::types::{ContainerId, PageRequest, PageResponse};
use osfs_entity::audit::AuditLogEntry;

use super::db_err;
use super::rows::AuditRow;

/// Audit log persisted in PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgAuditLog {
    pool: PgPool,
}

impl PgAuditLog {
    /// Create a new audit log over the pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One page of entries for a container, newest first.
    pub async fn list_for_container(
        &self,
        container: ContainerId,
        page: PageRequest,
    ) -> AppResult<PageResponse<AuditLogEntry>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM audit_log WHERE container_id = $1")
                .bind(container)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err("Failed to count audit entries"))?;

        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT id, action, container_id, user_id, params, created_at FROM audit_log \
             WHERE container_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(container)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list audit entries"))?;

        Ok(PageResponse::new(
            rows.into_iter().map(AuditLogEntry::from).collect(),
            page,
            total as u64,
        ))
    }
}

#[async_trait]
impl AuditSink for PgAuditLog {
    async fn record(&self, record: AuditRecord) -> AppResult<()> {
        let entry = AuditLogEntry::from(record);
        sqlx::query(
            "INSERT INTO audit_log (id, action, container_id, user_id, params, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(entry.id)
        .bind(&entry.action)
        .bind(entry.container_id)
        .bind(entry.user_id)
        .bind(&entry.params)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(action = %entry.action, error = %e, "Failed to write audit entry");
            db_err("Failed to write audit entry")(e)
        })?;
        Ok(())
    }
}
