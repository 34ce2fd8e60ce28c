//! File-node tree: roots, children, lookups and guids.

pub mod guid;
pub mod service;

pub use guid::GuidService;
pub use service::TreeService;
