//! Soft deletion and restore.

pub mod service;

pub use service::TrashService;
