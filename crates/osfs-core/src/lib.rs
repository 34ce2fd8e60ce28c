//! # osfs-core
//!
//! Core crate for osfstorage. Contains the unified error system, typed
//! identifiers, pagination, configuration schemas, and the traits through
//! which the file-node engine talks to its external collaborators (audit
//! log sink, primary-file registry).
//!
//! This crate has **no** internal dependencies on other osfstorage crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorDetail, ErrorKind};
pub use result::AppResult;
