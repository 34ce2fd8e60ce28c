//! Version table of the in-memory store.

use async_trait::async_trait;
use chrono::Utc;

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_core::types::{ContainerId, NodeId, VersionId};
use osfs_entity::version::{FileVersion, FileVersionLink};

use super::MemoryStore;
use crate::store::VersionRepository;

#[async_trait]
impl VersionRepository for MemoryStore {
    async fn attach_new_version(
        &self,
        file_id: NodeId,
        version: &FileVersion,
        version_name: &str,
    ) -> AppResult<FileVersionLink> {
        let mut state = self.state.write().await;
        let file = state
            .nodes
            .get(&file_id)
            .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))?;
        file.ensure_file()?;
        if state.versions.contains_key(&version.id) {
            return Err(AppError::conflict(format!(
                "Version {} already exists",
                version.id
            )));
        }

        let links = state.links.entry(file_id).or_default();
        let identifier = links.last().map(|l| l.identifier).unwrap_or(0) + 1;
        let link = FileVersionLink {
            file_id,
            version_id: version.id,
            identifier,
            version_name: version_name.to_string(),
            download_count: 0,
            created_at: Utc::now(),
        };
        links.push(link.clone());
        state.versions.insert(version.id, version.clone());
        Ok(link)
    }

    async fn find_version(&self, id: VersionId) -> AppResult<Option<FileVersion>> {
        Ok(self.state.read().await.versions.get(&id).cloned())
    }

    async fn find_links(&self, file_id: NodeId) -> AppResult<Vec<FileVersionLink>> {
        let state = self.state.read().await;
        Ok(state
            .links
            .get(&file_id)
            .map(|links| links.iter().cloned().map(|l| self.with_downloads(l)).collect())
            .unwrap_or_default())
    }

    async fn find_link(
        &self,
        file_id: NodeId,
        identifier: i64,
    ) -> AppResult<Option<FileVersionLink>> {
        let state = self.state.read().await;
        Ok(state
            .links
            .get(&file_id)
            .and_then(|links| links.iter().find(|l| l.identifier == identifier))
            .cloned()
            .map(|l| self.with_downloads(l)))
    }

    async fn latest_link(&self, file_id: NodeId) -> AppResult<Option<FileVersionLink>> {
        let state = self.state.read().await;
        Ok(state
            .links
            .get(&file_id)
            .and_then(|links| links.last())
            .cloned()
            .map(|l| self.with_downloads(l)))
    }

    async fn count_links(&self, file_id: NodeId) -> AppResult<u64> {
        let state = self.state.read().await;
        Ok(state.links.get(&file_id).map_or(0, |l| l.len() as u64))
    }

    async fn update_version_metadata(&self, version: &FileVersion) -> AppResult<()> {
        let mut state = self.state.write().await;
        let stored = state
            .versions
            .get_mut(&version.id)
            .ok_or_else(|| AppError::not_found(format!("Version {} not found", version.id)))?;
        stored.metadata = version.metadata.clone();
        stored.size = version.size;
        stored.content_type = version.content_type.clone();
        stored.md5 = version.md5.clone();
        stored.sha256 = version.sha256.clone();
        stored.external_modified = version.external_modified;
        Ok(())
    }

    async fn find_archived_by_sha256(
        &self,
        sha256: &str,
        target: &FileVersion,
    ) -> AppResult<Option<FileVersion>> {
        let state = self.state.read().await;
        Ok(state
            .versions
            .values()
            .filter(|v| v.id != target.id && v.created_at < target.created_at)
            .filter(|v| v.sha256.as_deref() == Some(sha256))
            .filter(|v| v.has_archive())
            .min_by_key(|v| v.created_at)
            .cloned())
    }

    async fn find_unarchived_versions(&self, limit: u64) -> AppResult<Vec<FileVersion>> {
        let state = self.state.read().await;
        let mut pending: Vec<FileVersion> = state
            .versions
            .values()
            .filter(|v| v.sha256.is_some() && !v.has_archive())
            .cloned()
            .collect();
        pending.sort_by_key(|v| v.created_at);
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn increment_download(&self, file_id: NodeId, version_id: VersionId) -> AppResult<i64> {
        {
            let state = self.state.read().await;
            let linked = state
                .links
                .get(&file_id)
                .is_some_and(|links| links.iter().any(|l| l.version_id == version_id));
            if !linked {
                return Err(AppError::not_found(format!(
                    "Version {version_id} is not linked to file {file_id}"
                )));
            }
        }
        let mut counter = self.downloads.entry((file_id, version_id)).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn container_usage(&self, container: ContainerId) -> AppResult<i64> {
        let state = self.state.read().await;
        let total = state
            .nodes
            .values()
            .filter(|n| n.container_id == container && n.is_file())
            .filter_map(|n| state.links.get(&n.id))
            .flatten()
            .filter_map(|l| state.versions.get(&l.version_id))
            .filter_map(|v| v.size)
            .sum();
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NodeRepository;
    use osfs_core::types::ContainerId;
    use osfs_entity::node::{CreateNode, NodeKind};
    use osfs_entity::version::{CreateVersion, VersionLocation};
    use serde_json::{Map, json};

    async fn seeded() -> (MemoryStore, NodeId) {
        let store = MemoryStore::new();
        let now = Utc::now();
        let root = CreateNode::root(ContainerId::new(), "osfstorage").into_node(now);
        store.insert_node(&root).await.unwrap();
        let file = CreateNode::child_of(&root, NodeKind::File, "a.txt").into_node(now);
        store.insert_node(&file).await.unwrap();
        (store, file.id)
    }

    fn version(object: &str, size: i64) -> FileVersion {
        let metadata = json!({"size": size}).as_object().cloned().unwrap_or_else(Map::new);
        CreateVersion {
            creator: None,
            location: VersionLocation::from_value(json!({"service": "cloud", "object": object})),
            metadata,
        }
        .into_version("us-east-1", Utc::now())
    }

    #[tokio::test]
    async fn test_identifiers_are_sequential() {
        let (store, file) = seeded().await;
        for (i, object) in ["a", "b", "c"].iter().enumerate() {
            let link = store
                .attach_new_version(file, &version(object, 1), "a.txt")
                .await
                .unwrap();
            assert_eq!(link.identifier, i as i64 + 1);
        }
        assert_eq!(store.count_links(file).await.unwrap(), 3);
        assert_eq!(store.latest_link(file).await.unwrap().unwrap().identifier, 3);
    }

    #[tokio::test]
    async fn test_download_counter_requires_link() {
        let (store, file) = seeded().await;
        let v = version("a", 5);
        store.attach_new_version(file, &v, "a.txt").await.unwrap();

        assert_eq!(store.increment_download(file, v.id).await.unwrap(), 1);
        assert_eq!(store.increment_download(file, v.id).await.unwrap(), 2);
        assert_eq!(
            store.find_link(file, 1).await.unwrap().unwrap().download_count,
            2
        );
        assert!(store.increment_download(file, VersionId::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_usage_sums_linked_sizes() {
        let (store, file) = seeded().await;
        store
            .attach_new_version(file, &version("a", 10), "a.txt")
            .await
            .unwrap();
        store
            .attach_new_version(file, &version("b", 32), "a.txt")
            .await
            .unwrap();
        let container = store.find_node(file).await.unwrap().unwrap().container_id;
        assert_eq!(store.container_usage(container).await.unwrap(), 42);
    }
}
