//! Repository traits and atomic mutation plans.
//!
//! Read operations and single-row writes are plain trait methods. Every
//! operation that touches more than one row (move, copy, trash, restore)
//! is first computed by the service layer as a plan and then handed to
//! [`MutationRepository`], whose implementations commit the whole plan or
//! nothing.
//!
//! Node writes are compare-and-swap: the `row_version` on the node passed
//! in is the version the caller read, and the store fails with
//! `ErrorKind::Conflict` if the stored row moved on in the meantime.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use osfs_core::result::AppResult;
use osfs_core::types::{
    ContainerId, JobId, NodeId, PageRequest, PageResponse, UserId, VersionId,
};
use osfs_entity::container::Container;
use osfs_entity::guid::Guid;
use osfs_entity::job::{Job, JobStatus};
use osfs_entity::node::{FileNode, TrashedFileNode};
use osfs_entity::version::{FileVersion, FileVersionLink};

/// Container registry.
#[async_trait]
pub trait ContainerRepository: Send + Sync {
    /// Insert the container if unknown and return the stored row.
    async fn upsert_container(&self, container: &Container) -> AppResult<Container>;

    /// Find a container by id.
    async fn find_container(&self, id: ContainerId) -> AppResult<Option<Container>>;
}

/// Live file nodes.
#[async_trait]
pub trait NodeRepository: Send + Sync {
    /// Find a live node by id.
    async fn find_node(&self, id: NodeId) -> AppResult<Option<FileNode>>;

    /// Find the root folder of a (container, provider) pair.
    async fn find_root(&self, container: ContainerId, provider: &str)
    -> AppResult<Option<FileNode>>;

    /// Insert a new node. Inserting a second root for the same
    /// (container, provider) fails with `Conflict`.
    async fn insert_node(&self, node: &FileNode) -> AppResult<FileNode>;

    /// Compare-and-swap update of a single node. Returns the stored row
    /// with its bumped `row_version`.
    async fn update_node(&self, node: &FileNode) -> AppResult<FileNode>;

    /// One page of the live children of a folder, ordered by name then id.
    async fn find_children(
        &self,
        parent: NodeId,
        page: PageRequest,
    ) -> AppResult<PageResponse<FileNode>>;

    /// The live child of `parent` named exactly `name`.
    async fn find_child_by_name(&self, parent: NodeId, name: &str) -> AppResult<Option<FileNode>>;

    /// Ids of the ancestors of a node, nearest first, root last.
    async fn find_ancestor_ids(&self, id: NodeId) -> AppResult<Vec<NodeId>>;

    /// Live files checked out by `user`, optionally restricted to one container.
    async fn find_checked_out_by(
        &self,
        user: UserId,
        container: Option<ContainerId>,
    ) -> AppResult<Vec<FileNode>>;
}

/// Version records and their per-file links.
#[async_trait]
pub trait VersionRepository: Send + Sync {
    /// Store a new version and attach it to `file_id` with the next
    /// identifier, assigned atomically by the store.
    async fn attach_new_version(
        &self,
        file_id: NodeId,
        version: &FileVersion,
        version_name: &str,
    ) -> AppResult<FileVersionLink>;

    /// Find a version by id.
    async fn find_version(&self, id: VersionId) -> AppResult<Option<FileVersion>>;

    /// Links of a file in ascending identifier order.
    async fn find_links(&self, file_id: NodeId) -> AppResult<Vec<FileVersionLink>>;

    /// The link with the given identifier.
    async fn find_link(&self, file_id: NodeId, identifier: i64)
    -> AppResult<Option<FileVersionLink>>;

    /// The link with the highest identifier.
    async fn latest_link(&self, file_id: NodeId) -> AppResult<Option<FileVersionLink>>;

    /// Count links of a file.
    async fn count_links(&self, file_id: NodeId) -> AppResult<u64>;

    /// Persist metadata and the attributes mirrored from it. Location,
    /// region and creator are left untouched.
    async fn update_version_metadata(&self, version: &FileVersion) -> AppResult<()>;

    /// The oldest version created before `target` with the given sha256
    /// that carries archive info.
    async fn find_archived_by_sha256(
        &self,
        sha256: &str,
        target: &FileVersion,
    ) -> AppResult<Option<FileVersion>>;

    /// Versions with a sha256 but without archive info, oldest first.
    async fn find_unarchived_versions(&self, limit: u64) -> AppResult<Vec<FileVersion>>;

    /// Increment and return the download counter of a (file, version) pair.
    async fn increment_download(&self, file_id: NodeId, version_id: VersionId) -> AppResult<i64>;

    /// Sum of the sizes of every version linked to a live file of the container.
    async fn container_usage(&self, container: ContainerId) -> AppResult<i64>;
}

/// Trashed nodes.
#[async_trait]
pub trait TrashRepository: Send + Sync {
    /// Find a trashed node by id.
    async fn find_trashed(&self, id: NodeId) -> AppResult<Option<TrashedFileNode>>;

    /// Nodes trashed in the same operation as, and directly under, `id`.
    async fn find_trashed_children(&self, id: NodeId) -> AppResult<Vec<TrashedFileNode>>;

    /// One page of the trash of a container, most recently deleted first.
    async fn list_trashed(
        &self,
        container: ContainerId,
        page: PageRequest,
    ) -> AppResult<PageResponse<TrashedFileNode>>;
}

/// Public references to nodes.
#[async_trait]
pub trait GuidRepository: Send + Sync {
    /// Find a guid row.
    async fn find_guid(&self, guid: &str) -> AppResult<Option<Guid>>;

    /// The guid minted for a node, if any.
    async fn find_guid_for_node(&self, node_id: NodeId) -> AppResult<Option<Guid>>;

    /// Store a freshly minted guid.
    async fn insert_guid(&self, guid: &Guid) -> AppResult<Guid>;
}

/// Durable queue of background jobs.
///
/// A job is claimed by one worker at a time. Claimed jobs that are never
/// settled (the worker died) go back to `pending` through
/// [`JobRepository::requeue_stale_jobs`].
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Store a new pending job.
    async fn insert_job(&self, job: &Job) -> AppResult<Job>;

    /// Claim the oldest pending job for `worker_id`, marking it running.
    async fn claim_next_job(&self, worker_id: &str) -> AppResult<Option<Job>>;

    /// Mark a running job completed.
    async fn complete_job(&self, id: JobId) -> AppResult<()>;

    /// Mark a running job failed for good.
    async fn fail_job(&self, id: JobId, error: &str) -> AppResult<()>;

    /// Return a running job to `pending` with one more failed attempt counted.
    async fn release_job(&self, id: JobId, error: &str) -> AppResult<()>;

    /// Return every job still running since before `claimed_before` to
    /// `pending`. Returns how many were requeued.
    async fn requeue_stale_jobs(&self, claimed_before: DateTime<Utc>) -> AppResult<u64>;

    /// Delete completed and failed jobs last updated before `before`.
    async fn purge_finished_jobs(&self, before: DateTime<Utc>) -> AppResult<u64>;

    /// Number of jobs in `status`.
    async fn count_jobs(&self, status: JobStatus) -> AppResult<u64>;
}

/// Relocation of an existing subtree.
#[derive(Debug, Clone, Default)]
pub struct MovePlan {
    /// Every node whose row changes, carrying the `row_version` read.
    pub updates: Vec<FileNode>,
    /// When set, versions of every file in `updates` are re-tagged to this region.
    pub region: Option<String>,
    /// New version-name for the latest link of renamed files.
    pub version_names: Vec<(NodeId, String)>,
}

/// Duplication of a subtree, parents before children.
#[derive(Debug, Clone, Default)]
pub struct CopyPlan {
    /// New nodes to insert.
    pub nodes: Vec<FileNode>,
    /// Links aliasing the source files' versions onto the new files.
    pub links: Vec<FileVersionLink>,
}

/// Conversion of a live subtree into trashed rows, parents first.
#[derive(Debug, Clone, Default)]
pub struct TrashPlan {
    /// One entry per live node, each carrying the `row_version` read.
    pub nodes: Vec<TrashedFileNode>,
}

/// Conversion of trashed rows back into live nodes, parents first.
#[derive(Debug, Clone, Default)]
pub struct RestorePlan {
    /// Live nodes to recreate, keeping their ids.
    pub nodes: Vec<FileNode>,
}

/// Multi-row mutations, each committed atomically.
#[async_trait]
pub trait MutationRepository: Send + Sync {
    /// Apply a move. Returns the stored rows in plan order.
    async fn apply_move(&self, plan: &MovePlan) -> AppResult<Vec<FileNode>>;

    /// Insert a copied subtree.
    async fn apply_copy(&self, plan: &CopyPlan) -> AppResult<()>;

    /// Remove live rows, insert their trashed shadows and flag their guids.
    async fn apply_trash(&self, plan: &TrashPlan) -> AppResult<()>;

    /// Remove trashed rows, insert the live nodes and unflag their guids.
    async fn apply_restore(&self, plan: &RestorePlan) -> AppResult<()>;
}

/// Everything the service layer needs from persistence.
pub trait Store:
    ContainerRepository
    + NodeRepository
    + VersionRepository
    + TrashRepository
    + GuidRepository
    + MutationRepository
    + std::fmt::Debug
    + 'static
{
}

impl<T> Store for T where
    T: ContainerRepository
        + NodeRepository
        + VersionRepository
        + TrashRepository
        + GuidRepository
        + MutationRepository
        + std::fmt::Debug
        + 'static
{
}
