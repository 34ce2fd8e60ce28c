//! Version chain of files.

pub mod archive;
pub mod service;

pub use service::{VersionEntry, VersionOutcome, VersionService};
