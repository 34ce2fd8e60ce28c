//! Containers, live nodes, trash and guids in PostgreSQL.

use async_trait::async_trait;
use sqlx::PgExecutor;

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_core::types::{ContainerId, NodeId, PageRequest, PageResponse, UserId};
use osfs_entity::container::Container;
use osfs_entity::guid::Guid;
use osfs_entity::node::{FileNode, TrashedFileNode};

use super::rows::{
    ContainerRow, GuidRow, NODE_COLUMNS, NodeRow, TRASHED_COLUMNS, TrashedRow, convert_all,
};
use super::{PgStore, db_err};
use crate::store::{ContainerRepository, GuidRepository, NodeRepository, TrashRepository};

/// Insert a live node row.
pub(crate) async fn insert_node_row<'e>(
    executor: impl PgExecutor<'e>,
    node: &FileNode,
) -> AppResult<FileNode> {
    let row = sqlx::query_as::<_, NodeRow>(&format!(
        "INSERT INTO file_nodes ({NODE_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         RETURNING {NODE_COLUMNS}"
    ))
    .bind(node.id)
    .bind(node.kind.as_str())
    .bind(&node.name)
    .bind(&node.materialized_path)
    .bind(&node.provider)
    .bind(node.parent_id)
    .bind(node.is_root)
    .bind(node.container_id)
    .bind(node.checkout)
    .bind(node.tags.iter().cloned().collect::<Vec<_>>())
    .bind(node.row_version)
    .bind(node.created_at)
    .bind(node.modified_at)
    .fetch_one(executor)
    .await
    .map_err(db_err("Failed to insert file node"))?;
    FileNode::try_from(row)
}

/// Compare-and-swap update of a live node row. `None` when the row is
/// missing or its `row_version` moved on.
pub(crate) async fn update_node_row<'e>(
    executor: impl PgExecutor<'e>,
    node: &FileNode,
) -> AppResult<Option<FileNode>> {
    let row = sqlx::query_as::<_, NodeRow>(&format!(
        "UPDATE file_nodes SET name = $3, materialized_path = $4, provider = $5, \
         parent_id = $6, container_id = $7, checkout = $8, tags = $9, modified_at = $10, \
         row_version = row_version + 1 \
         WHERE id = $1 AND row_version = $2 RETURNING {NODE_COLUMNS}"
    ))
    .bind(node.id)
    .bind(node.row_version)
    .bind(&node.name)
    .bind(&node.materialized_path)
    .bind(&node.provider)
    .bind(node.parent_id)
    .bind(node.container_id)
    .bind(node.checkout)
    .bind(node.tags.iter().cloned().collect::<Vec<_>>())
    .bind(node.modified_at)
    .fetch_optional(executor)
    .await
    .map_err(db_err("Failed to update file node"))?;
    row.map(FileNode::try_from).transpose()
}

/// The error for a failed compare-and-swap on `node`.
pub(crate) fn stale(node: &FileNode) -> AppError {
    AppError::conflict(format!(
        "Node {} was modified concurrently or no longer exists",
        node.id
    ))
    .for_node(node.id)
}

#[async_trait]
impl ContainerRepository for PgStore {
    async fn upsert_container(&self, container: &Container) -> AppResult<Container> {
        sqlx::query(
            "INSERT INTO containers (id, kind, region, created_at) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(container.id)
        .bind(container.kind.as_str())
        .bind(&container.region)
        .bind(container.created_at)
        .execute(self.pool())
        .await
        .map_err(db_err("Failed to register container"))?;

        self.find_container(container.id)
            .await?
            .ok_or_else(|| AppError::internal(format!("Container {} vanished", container.id)))
    }

    async fn find_container(&self, id: ContainerId) -> AppResult<Option<Container>> {
        sqlx::query_as::<_, ContainerRow>(
            "SELECT id, kind, region, created_at FROM containers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(db_err("Failed to find container"))?
        .map(Container::try_from)
        .transpose()
    }
}

#[async_trait]
impl NodeRepository for PgStore {
    async fn find_node(&self, id: NodeId) -> AppResult<Option<FileNode>> {
        sqlx::query_as::<_, NodeRow>(&format!(
            "SELECT {NODE_COLUMNS} FROM file_nodes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(db_err("Failed to find file node"))?
        .map(FileNode::try_from)
        .transpose()
    }

    async fn find_root(
        &self,
        container: ContainerId,
        provider: &str,
    ) -> AppResult<Option<FileNode>> {
        sqlx::query_as::<_, NodeRow>(&format!(
            "SELECT {NODE_COLUMNS} FROM file_nodes \
             WHERE container_id = $1 AND provider = $2 AND is_root"
        ))
        .bind(container)
        .bind(provider)
        .fetch_optional(self.pool())
        .await
        .map_err(db_err("Failed to find root folder"))?
        .map(FileNode::try_from)
        .transpose()
    }

    async fn insert_node(&self, node: &FileNode) -> AppResult<FileNode> {
        insert_node_row(self.pool(), node).await
    }

    async fn update_node(&self, node: &FileNode) -> AppResult<FileNode> {
        update_node_row(self.pool(), node)
            .await?
            .ok_or_else(|| stale(node))
    }

    async fn find_children(
        &self,
        parent: NodeId,
        page: PageRequest,
    ) -> AppResult<PageResponse<FileNode>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM file_nodes WHERE parent_id = $1")
            .bind(parent)
            .fetch_one(self.pool())
            .await
            .map_err(db_err("Failed to count children"))?;

        let rows = sqlx::query_as::<_, NodeRow>(&format!(
            "SELECT {NODE_COLUMNS} FROM file_nodes WHERE parent_id = $1 \
             ORDER BY name ASC, id ASC LIMIT $2 OFFSET $3"
        ))
        .bind(parent)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(self.pool())
        .await
        .map_err(db_err("Failed to list children"))?;

        Ok(PageResponse::new(convert_all(rows)?, page, total as u64))
    }

    async fn find_child_by_name(&self, parent: NodeId, name: &str) -> AppResult<Option<FileNode>> {
        sqlx::query_as::<_, NodeRow>(&format!(
            "SELECT {NODE_COLUMNS} FROM file_nodes WHERE parent_id = $1 AND name = $2 \
             ORDER BY created_at ASC LIMIT 1"
        ))
        .bind(parent)
        .bind(name)
        .fetch_optional(self.pool())
        .await
        .map_err(db_err("Failed to find child by name"))?
        .map(FileNode::try_from)
        .transpose()
    }

    async fn find_ancestor_ids(&self, id: NodeId) -> AppResult<Vec<NodeId>> {
        sqlx::query_scalar::<_, NodeId>(
            "WITH RECURSIVE chain (id, parent_id, depth) AS ( \
                 SELECT id, parent_id, 0 FROM file_nodes WHERE id = $1 \
                 UNION ALL \
                 SELECT n.id, n.parent_id, c.depth + 1 FROM file_nodes n \
                 JOIN chain c ON n.id = c.parent_id \
             ) CYCLE id SET is_cycle USING path \
             SELECT id FROM chain WHERE depth > 0 AND NOT is_cycle ORDER BY depth ASC",
        )
        .bind(id)
        .fetch_all(self.pool())
        .await
        .map_err(db_err("Failed to load ancestors"))
    }

    async fn find_checked_out_by(
        &self,
        user: UserId,
        container: Option<ContainerId>,
    ) -> AppResult<Vec<FileNode>> {
        let rows = sqlx::query_as::<_, NodeRow>(&format!(
            "SELECT {NODE_COLUMNS} FROM file_nodes \
             WHERE checkout = $1 AND ($2::uuid IS NULL OR container_id = $2) \
             ORDER BY materialized_path ASC"
        ))
        .bind(user)
        .bind(container)
        .fetch_all(self.pool())
        .await
        .map_err(db_err("Failed to list checked out files"))?;
        convert_all(rows)
    }
}

#[async_trait]
impl TrashRepository for PgStore {
    async fn find_trashed(&self, id: NodeId) -> AppResult<Option<TrashedFileNode>> {
        sqlx::query_as::<_, TrashedRow>(&format!(
            "SELECT {TRASHED_COLUMNS} FROM trashed_file_nodes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(db_err("Failed to find trashed node"))?
        .map(TrashedFileNode::try_from)
        .transpose()
    }

    async fn find_trashed_children(&self, id: NodeId) -> AppResult<Vec<TrashedFileNode>> {
        let rows = sqlx::query_as::<_, TrashedRow>(&format!(
            "SELECT {TRASHED_COLUMNS} FROM trashed_file_nodes \
             WHERE trashed_parent_id = $1 ORDER BY name ASC"
        ))
        .bind(id)
        .fetch_all(self.pool())
        .await
        .map_err(db_err("Failed to list trashed children"))?;
        convert_all(rows)
    }

    async fn list_trashed(
        &self,
        container: ContainerId,
        page: PageRequest,
    ) -> AppResult<PageResponse<TrashedFileNode>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM trashed_file_nodes WHERE container_id = $1")
                .bind(container)
                .fetch_one(self.pool())
                .await
                .map_err(db_err("Failed to count trashed nodes"))?;

        let rows = sqlx::query_as::<_, TrashedRow>(&format!(
            "SELECT {TRASHED_COLUMNS} FROM trashed_file_nodes WHERE container_id = $1 \
             ORDER BY deleted_on DESC LIMIT $2 OFFSET $3"
        ))
        .bind(container)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(self.pool())
        .await
        .map_err(db_err("Failed to list trash"))?;

        Ok(PageResponse::new(convert_all(rows)?, page, total as u64))
    }
}

#[async_trait]
impl GuidRepository for PgStore {
    async fn find_guid(&self, guid: &str) -> AppResult<Option<Guid>> {
        Ok(sqlx::query_as::<_, GuidRow>(
            "SELECT guid, node_id, trashed, created_at FROM guids WHERE guid = $1",
        )
        .bind(guid)
        .fetch_optional(self.pool())
        .await
        .map_err(db_err("Failed to find guid"))?
        .map(Guid::from))
    }

    async fn find_guid_for_node(&self, node_id: NodeId) -> AppResult<Option<Guid>> {
        Ok(sqlx::query_as::<_, GuidRow>(
            "SELECT guid, node_id, trashed, created_at FROM guids WHERE node_id = $1",
        )
        .bind(node_id)
        .fetch_optional(self.pool())
        .await
        .map_err(db_err("Failed to find guid for node"))?
        .map(Guid::from))
    }

    async fn insert_guid(&self, guid: &Guid) -> AppResult<Guid> {
        let inserted = sqlx::query_as::<_, GuidRow>(
            "INSERT INTO guids (guid, node_id, trashed, created_at) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (node_id) DO NOTHING RETURNING guid, node_id, trashed, created_at",
        )
        .bind(&guid.guid)
        .bind(guid.node_id)
        .bind(guid.trashed)
        .bind(guid.created_at)
        .fetch_optional(self.pool())
        .await
        .map_err(db_err("Failed to insert guid"))?;

        match inserted {
            Some(row) => Ok(row.into()),
            None => self
                .find_guid_for_node(guid.node_id)
                .await?
                .ok_or_else(|| AppError::internal(format!("Guid for {} vanished", guid.node_id))),
        }
    }
}
