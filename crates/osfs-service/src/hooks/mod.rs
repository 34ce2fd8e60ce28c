//! Handlers behind the storage proxy's move, copy, delete and upload hooks.

pub mod payload;
pub mod service;

pub use payload::{DeletePayload, Destination, TransferPayload, UploadPayload};
pub use service::{HookService, UploadOutcome};
