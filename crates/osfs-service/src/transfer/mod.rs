//! Moving and copying subtrees.

pub mod plan;
pub mod service;

pub use service::TransferService;
