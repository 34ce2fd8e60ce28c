//! Audit emission shared by the services.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::warn;

use osfs_core::traits::audit::AuditSink;
use osfs_entity::audit::AuditAction;
use osfs_entity::node::FileNode;

use crate::context::RequestContext;

/// Writes one entry per audited action against the node's container.
///
/// The mutation has already committed when an entry is written, so a
/// failing sink is logged rather than surfaced.
#[derive(Debug, Clone)]
pub struct AuditTrail {
    sink: Arc<dyn AuditSink>,
}

impl AuditTrail {
    /// Wrap a sink.
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Record `action` on `node`, merging `extra` into the standard params.
    pub async fn record(
        &self,
        ctx: &RequestContext,
        action: AuditAction,
        node: &FileNode,
        extra: Value,
    ) {
        let mut params = json!({
            "node_id": node.id,
            "kind": node.kind,
            "path": node.materialized_path,
            "provider": node.provider,
        });
        if let (Some(params), Value::Object(extra)) = (params.as_object_mut(), extra) {
            params.extend(extra);
        }

        let record = action.record(node.container_id, ctx.user_id, params);
        if let Err(e) = self.sink.record(record).await {
            warn!(
                action = %action,
                node_id = %node.id,
                error = %e,
                "Failed to write audit entry"
            );
        }
    }
}
