//! Lock checks run before subtree mutations.

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_entity::node::FileNode;

/// Fail with `CheckedOut` if `node` or any of `descendants` is a
/// checked-out file. The first blocking file is reported.
pub(crate) fn ensure_unlocked(node: &FileNode, descendants: &[FileNode]) -> AppResult<()> {
    let blocking = std::iter::once(node)
        .chain(descendants)
        .find(|n| n.is_file() && n.is_checked_out());

    match blocking {
        Some(file) => {
            let mut err = AppError::checked_out(file.id, file.checkout.map(Into::into));
            if file.id != node.id {
                err.message = format!(
                    "{} blocks changes to {}: file {} is checked out",
                    node.kind, node.id, file.id
                );
            }
            Err(err)
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use osfs_core::error::ErrorKind;
    use osfs_core::types::{ContainerId, UserId};
    use osfs_entity::node::{CreateNode, NodeKind};

    #[test]
    fn test_descendant_checkout_blocks() {
        let now = Utc::now();
        let root = CreateNode::root(ContainerId::new(), "osfstorage").into_node(now);
        let folder = CreateNode::child_of(&root, NodeKind::Folder, "f").into_node(now);
        let mut file = CreateNode::child_of(&folder, NodeKind::File, "a").into_node(now);
        assert!(ensure_unlocked(&folder, std::slice::from_ref(&file)).is_ok());

        let holder = UserId::new();
        file.checkout = Some(holder);
        let err = ensure_unlocked(&folder, &[file.clone()]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::CheckedOut);
        assert_eq!(err.detail.node_id, Some(file.id.into_uuid()));
        assert_eq!(err.detail.user_id, Some(holder.into_uuid()));
    }
}
