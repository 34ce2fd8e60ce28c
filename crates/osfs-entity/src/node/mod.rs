//! File node domain entities.

pub mod model;
pub mod path;
pub mod trashed;
pub mod view;

pub use model::{CreateNode, FileNode, NodeKind};
pub use trashed::TrashedFileNode;
pub use view::NodeView;
