//! # osfs-database
//!
//! Persistence for the file-node engine. [`store`] defines the repository
//! traits the service layer is written against, together with the
//! mutation plans that must commit atomically. Two implementations exist:
//!
//! - [`postgres::PgStore`]: sqlx over PostgreSQL, one transaction per plan.
//! - [`memory::MemoryStore`]: a single write lock around in-process maps,
//!   used by tests and embedded deployments.
//!
//! The background job table sits beside them behind [`store::JobRepository`].

pub mod connection;
#[cfg(feature = "memory")]
pub mod memory;
pub mod migration;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod store;

pub use connection::DatabasePool;
#[cfg(feature = "memory")]
pub use memory::{MemoryAuditLog, MemoryJobStore, MemoryStore};
#[cfg(feature = "postgres")]
pub use postgres::{PgAuditLog, PgJobStore, PgStore};
pub use store::{
    ContainerRepository, CopyPlan, GuidRepository, JobRepository, MovePlan, MutationRepository,
    NodeRepository, RestorePlan, Store, TrashPlan, TrashRepository, VersionRepository,
};
