//! Audit sink that keeps entries in memory.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use osfs_core::result::AppResult;
use osfs_core::traits::audit::{AuditRecord, AuditSink};
use osfs_core::types::ContainerId;
use osfs_entity::audit::AuditLogEntry;

/// In-memory audit log.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditLog {
    entries: Arc<Mutex<Vec<AuditLogEntry>>>,
}

impl MemoryAuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry in insertion order.
    pub async fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.lock().await.clone()
    }

    /// Action names recorded against a container, in insertion order.
    pub async fn actions_for(&self, container: ContainerId) -> Vec<String> {
        self.entries
            .lock()
            .await
            .iter()
            .filter(|e| e.container_id == container)
            .map(|e| e.action.clone())
            .collect()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditLog {
    async fn record(&self, record: AuditRecord) -> AppResult<()> {
        self.entries.lock().await.push(AuditLogEntry::from(record));
        Ok(())
    }
}
