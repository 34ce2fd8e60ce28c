//! Mutation plans, one transaction each.

use async_trait::async_trait;
use tracing::debug;

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_core::types::NodeId;
use osfs_entity::node::FileNode;

use super::nodes::{insert_node_row, stale, update_node_row};
use super::rows::TRASHED_COLUMNS;
use super::versions::insert_link_row;
use super::{PgStore, commit, db_err};
use crate::store::{CopyPlan, MovePlan, MutationRepository, RestorePlan, TrashPlan};

#[async_trait]
impl MutationRepository for PgStore {
    async fn apply_move(&self, plan: &MovePlan) -> AppResult<Vec<FileNode>> {
        let mut tx = self.begin().await?;

        let mut stored = Vec::with_capacity(plan.updates.len());
        for node in &plan.updates {
            let row = update_node_row(&mut *tx, node)
                .await?
                .ok_or_else(|| stale(node))?;
            stored.push(row);
        }

        if let Some(region) = &plan.region {
            let file_ids: Vec<NodeId> = plan
                .updates
                .iter()
                .filter(|n| n.is_file())
                .map(|n| n.id)
                .collect();
            sqlx::query(
                "UPDATE file_versions SET region = $1 WHERE id IN ( \
                     SELECT version_id FROM file_version_links WHERE file_id = ANY($2))",
            )
            .bind(region)
            .bind(&file_ids)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to retag version regions"))?;
        }

        for (file_id, name) in &plan.version_names {
            sqlx::query(
                "UPDATE file_version_links SET version_name = $2 \
                 WHERE file_id = $1 AND identifier = ( \
                     SELECT MAX(identifier) FROM file_version_links WHERE file_id = $1)",
            )
            .bind(file_id)
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to rename latest version"))?;
        }

        commit(tx).await?;
        debug!(nodes = stored.len(), "Move plan committed");
        Ok(stored)
    }

    async fn apply_copy(&self, plan: &CopyPlan) -> AppResult<()> {
        let mut tx = self.begin().await?;
        for node in &plan.nodes {
            insert_node_row(&mut *tx, node).await?;
        }
        for link in &plan.links {
            insert_link_row(&mut *tx, link).await?;
        }
        commit(tx).await?;
        debug!(nodes = plan.nodes.len(), links = plan.links.len(), "Copy plan committed");
        Ok(())
    }

    async fn apply_trash(&self, plan: &TrashPlan) -> AppResult<()> {
        let mut tx = self.begin().await?;

        for trashed in &plan.nodes {
            let node = &trashed.node;
            if node.is_root {
                return Err(AppError::validation("Root folders cannot be deleted").for_node(node.id));
            }
            let deleted = sqlx::query(
                "DELETE FROM file_nodes WHERE id = $1 AND row_version = $2",
            )
            .bind(node.id)
            .bind(node.row_version)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to remove live node"))?;
            if deleted.rows_affected() == 0 {
                return Err(stale(node));
            }

            sqlx::query(&format!(
                "INSERT INTO trashed_file_nodes ({TRASHED_COLUMNS}) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"
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
            .bind(trashed.deleted_on)
            .bind(trashed.deleted_by)
            .bind(trashed.trashed_parent_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to insert trashed node"))?;
        }

        let ids: Vec<NodeId> = plan.nodes.iter().map(|t| t.id()).collect();
        sqlx::query("UPDATE guids SET trashed = TRUE WHERE node_id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to flag guids"))?;

        commit(tx).await?;
        debug!(nodes = ids.len(), "Trash plan committed");
        Ok(())
    }

    async fn apply_restore(&self, plan: &RestorePlan) -> AppResult<()> {
        let mut tx = self.begin().await?;

        for node in &plan.nodes {
            let removed = sqlx::query("DELETE FROM trashed_file_nodes WHERE id = $1")
                .bind(node.id)
                .execute(&mut *tx)
                .await
                .map_err(db_err("Failed to remove trashed node"))?;
            if removed.rows_affected() == 0 {
                return Err(AppError::not_found(format!(
                    "Trashed node {} not found",
                    node.id
                )));
            }
            insert_node_row(&mut *tx, node).await?;
        }

        let ids: Vec<NodeId> = plan.nodes.iter().map(|n| n.id).collect();
        sqlx::query("UPDATE guids SET trashed = FALSE WHERE node_id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to unflag guids"))?;

        // Parent references are only enforced at commit.
        let dangling: Option<NodeId> = sqlx::query_scalar(
            "SELECT n.id FROM file_nodes n LEFT JOIN file_nodes p ON p.id = n.parent_id \
             WHERE n.id = ANY($1) AND n.parent_id IS NOT NULL AND p.id IS NULL LIMIT 1",
        )
        .bind(&ids)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err("Failed to verify restored parents"))?;
        if let Some(id) = dangling {
            return Err(AppError::not_found(format!("Parent of {id} not found")).for_node(id));
        }

        commit(tx).await?;
        debug!(nodes = ids.len(), "Restore plan committed");
        Ok(())
    }
}
