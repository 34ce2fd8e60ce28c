//! # osfs-service
//!
//! The file-node engine. Each service owns one concern (tree, versions,
//! checkout, move/copy, trash, tags, hooks) and receives its
//! collaborators as `Arc`s at construction; [`Services`] wires them all
//! over one store.
//!
//! Multi-row changes are computed here as plans and committed by the
//! store in one step, so a failed validation or a concurrent writer never
//! leaves a subtree half-moved or half-trashed.

pub mod audit;
pub mod checkout;
pub mod context;
pub mod hooks;
pub mod primary;
pub mod services;
pub mod tags;
pub mod tasks;
pub mod transfer;
pub mod trash;
pub mod tree;
pub mod version;

pub use audit::AuditTrail;
pub use checkout::CheckoutService;
pub use context::{ActorRole, RequestContext};
pub use hooks::{HookService, UploadOutcome};
pub use primary::{InMemoryPrimaryFiles, NoPrimaryFiles};
pub use services::{ServiceDeps, Services};
pub use tags::TagService;
pub use tasks::{BackgroundTask, BackgroundTasks, NoopTasks};
pub use transfer::TransferService;
pub use trash::TrashService;
pub use tree::{GuidService, TreeService};
pub use version::{VersionEntry, VersionOutcome, VersionService};
