//! File version domain entities.

pub mod link;
pub mod location;
pub mod model;

pub use link::FileVersionLink;
pub use location::VersionLocation;
pub use model::{CreateVersion, FileVersion};
