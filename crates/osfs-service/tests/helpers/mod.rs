//! Shared fixtures for the service integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{Map, Value, json};
use tokio::sync::Mutex;

use osfs_core::config::StorageConfig;
use osfs_core::result::AppResult;
use osfs_core::types::{ContainerId, NodeId, UserId};
use osfs_database::{MemoryAuditLog, MemoryStore};
use osfs_entity::container::{Container, ContainerKind};
use osfs_entity::node::FileNode;
use osfs_entity::version::{CreateVersion, VersionLocation};
use osfs_service::{
    BackgroundTask, BackgroundTasks, InMemoryPrimaryFiles, RequestContext, ServiceDeps, Services,
    VersionOutcome,
};

/// Task sink that remembers what it was given.
#[derive(Debug, Default)]
pub struct RecordingTasks {
    pub tasks: Mutex<Vec<BackgroundTask>>,
}

#[async_trait::async_trait]
impl BackgroundTasks for RecordingTasks {
    async fn dispatch(&self, task: BackgroundTask) -> AppResult<()> {
        self.tasks.lock().await.push(task);
        Ok(())
    }
}

/// An engine over the in-memory store.
pub struct TestEnv {
    pub store: MemoryStore,
    pub audit: MemoryAuditLog,
    pub primary: Arc<InMemoryPrimaryFiles>,
    pub tasks: Arc<RecordingTasks>,
    pub services: Services,
}

impl TestEnv {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let audit = MemoryAuditLog::new();
        let primary = Arc::new(InMemoryPrimaryFiles::new());
        let tasks = Arc::new(RecordingTasks::default());
        let services = Services::new(ServiceDeps {
            store: Arc::new(store.clone()),
            audit: Arc::new(audit.clone()),
            primary: primary.clone(),
            tasks: tasks.clone(),
            storage: StorageConfig::default(),
            conflict_retries: 3,
        });
        Self {
            store,
            audit,
            primary,
            tasks,
            services,
        }
    }

    /// A fresh project in `region` and its root folder.
    pub async fn project(&self, region: &str) -> (Container, FileNode) {
        let container = Container::new(ContainerId::new(), ContainerKind::Project, region);
        let root = self
            .services
            .tree
            .get_root(&container, None)
            .await
            .expect("root");
        (container, root)
    }

    pub async fn folder(&self, parent: &FileNode, name: &str) -> FileNode {
        self.services
            .tree
            .append_folder(&RequestContext::system(), parent.id, name)
            .await
            .expect("folder")
    }

    pub async fn file(&self, parent: &FileNode, name: &str) -> FileNode {
        self.services
            .tree
            .append_file(&RequestContext::system(), parent.id, name)
            .await
            .expect("file")
    }

    /// Record an upload of `object` with the given size.
    pub async fn upload(&self, file: NodeId, object: &str, size: i64) -> VersionOutcome {
        self.services
            .versions
            .create_version(&RequestContext::system(), file, upload(object, size))
            .await
            .expect("version")
    }

    /// Current state of a live node.
    pub async fn reload(&self, id: NodeId) -> FileNode {
        self.services.tree.get_node(id).await.expect("live node")
    }

    pub async fn usage(&self, container: &Container) -> i64 {
        self.services
            .versions
            .container_usage(container.id)
            .await
            .expect("usage")
    }
}

/// Upload description pointing at `object` in a fixed bucket.
pub fn upload(object: &str, size: i64) -> CreateVersion {
    CreateVersion {
        creator: None,
        location: location(object, "worker-1"),
        metadata: object_map(json!({ "size": size, "sha256": object })),
    }
}

pub fn location(object: &str, uname: &str) -> VersionLocation {
    VersionLocation::from_value(json!({
        "service": "cloud",
        "bucket": "osf-storage",
        "object": object,
        "uname": uname,
    }))
}

pub fn object_map(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

pub fn user() -> (UserId, RequestContext) {
    let id = UserId::new();
    (id, RequestContext::user(id))
}
