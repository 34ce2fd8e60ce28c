//! Primary-file lookup.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::NodeId;

/// Answers whether a file node is the designated primary document of some
/// externally tracked resource (e.g. a preprint).
///
/// Returns a human-readable label of the resource, used in the
/// constraint error, or `None` when the node is unconstrained.
#[async_trait]
pub trait PrimaryFileRegistry: Send + Sync + std::fmt::Debug + 'static {
    /// Look up the resource that uses `node_id` as its primary file.
    async fn primary_resource_of(&self, node_id: NodeId) -> AppResult<Option<String>>;
}
