//! # osfs-entity
//!
//! Domain entity models for the osfstorage file-node engine. Every struct
//! here is either a persisted row (file nodes, trashed nodes, versions,
//! version links, containers, guids, audit entries, background jobs) or a
//! value object (locations, serialized views). Persistence mapping lives in
//! `osfs-database`; this crate only knows the domain shape.

pub mod audit;
pub mod container;
pub mod guid;
pub mod job;
pub mod node;
pub mod version;

pub use audit::{AuditAction, AuditLogEntry};
pub use container::{Container, ContainerKind};
pub use guid::{Guid, GuidReferent};
pub use job::{Job, JobStatus};
pub use node::{CreateNode, FileNode, NodeKind, NodeView, TrashedFileNode};
pub use version::{CreateVersion, FileVersion, FileVersionLink, VersionLocation};
