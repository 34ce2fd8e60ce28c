//! Wiring of every service over one store.

use std::sync::Arc;

use osfs_core::config::StorageConfig;
use osfs_core::traits::audit::AuditSink;
use osfs_core::traits::primary::PrimaryFileRegistry;
use osfs_database::store::Store;

use crate::audit::AuditTrail;
use crate::checkout::CheckoutService;
use crate::hooks::HookService;
use crate::tags::TagService;
use crate::tasks::BackgroundTasks;
use crate::transfer::TransferService;
use crate::trash::TrashService;
use crate::tree::{GuidService, TreeService};
use crate::version::VersionService;

/// Collaborators the engine is built from.
#[derive(Debug, Clone)]
pub struct ServiceDeps {
    /// Persistence.
    pub store: Arc<dyn Store>,
    /// Audit log destination.
    pub audit: Arc<dyn AuditSink>,
    /// Primary-file lookups.
    pub primary: Arc<dyn PrimaryFileRegistry>,
    /// Background task dispatch.
    pub tasks: Arc<dyn BackgroundTasks>,
    /// Provider, region and paging settings.
    pub storage: StorageConfig,
    /// Retries for root creation races.
    pub conflict_retries: u32,
}

/// All services, sharing their dependencies.
#[derive(Debug, Clone)]
pub struct Services {
    /// Tree structure and lookups.
    pub tree: Arc<TreeService>,
    /// Guid minting and resolution.
    pub guids: Arc<GuidService>,
    /// Version history.
    pub versions: Arc<VersionService>,
    /// Checkout lock.
    pub checkout: Arc<CheckoutService>,
    /// Move, rename and copy.
    pub transfer: Arc<TransferService>,
    /// Delete and restore.
    pub trash: Arc<TrashService>,
    /// Tags.
    pub tags: Arc<TagService>,
    /// Proxy hook handlers.
    pub hooks: Arc<HookService>,
}

impl Services {
    /// Build every service from `deps`.
    pub fn new(deps: ServiceDeps) -> Self {
        let ServiceDeps {
            store,
            audit,
            primary,
            tasks,
            storage,
            conflict_retries,
        } = deps;
        let audit = AuditTrail::new(audit);

        let tree = Arc::new(TreeService::new(
            Arc::clone(&store),
            storage,
            conflict_retries,
        ));
        let guids = Arc::new(GuidService::new(Arc::clone(&store)));
        let versions = Arc::new(VersionService::new(
            Arc::clone(&store),
            Arc::clone(&tree),
            Arc::clone(&tasks),
        ));
        let checkout = Arc::new(CheckoutService::new(
            Arc::clone(&store),
            Arc::clone(&tree),
            audit.clone(),
            tasks,
        ));
        let transfer = Arc::new(TransferService::new(
            Arc::clone(&store),
            Arc::clone(&tree),
            Arc::clone(&primary),
        ));
        let trash = Arc::new(TrashService::new(
            Arc::clone(&store),
            Arc::clone(&tree),
            primary,
            audit.clone(),
        ));
        let tags = Arc::new(TagService::new(store, Arc::clone(&tree), audit));
        let hooks = Arc::new(HookService::new(
            Arc::clone(&tree),
            Arc::clone(&versions),
            Arc::clone(&transfer),
            Arc::clone(&trash),
        ));

        Self {
            tree,
            guids,
            versions,
            checkout,
            transfer,
            trash,
            tags,
            hooks,
        }
    }
}
