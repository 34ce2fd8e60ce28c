//! Traits for the external collaborators the engine calls into.
//!
//! Implementations live in `osfs-database` (persistent audit log) and
//! `osfs-service` (in-process registries); the request layer may supply
//! its own.

pub mod audit;
pub mod primary;

pub use audit::{AuditRecord, AuditSink};
pub use primary::PrimaryFileRegistry;
