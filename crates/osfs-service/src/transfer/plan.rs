//! Pure plan builders for move and copy.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_core::types::NodeId;
use osfs_database::store::{CopyPlan, MovePlan};
use osfs_entity::node::{CreateNode, FileNode, path};
use osfs_entity::version::FileVersionLink;

/// Rewrite `node` to live under `dest` as `name`, and every descendant to
/// follow it. Descendants whose row would not change are left out.
pub(crate) fn plan_move(
    node: &FileNode,
    descendants: &[FileNode],
    dest: &FileNode,
    name: &str,
    now: DateTime<Utc>,
) -> AppResult<MovePlan> {
    let old_prefix = node.materialized_path.clone();
    let new_prefix = dest.child_path(name, node.kind);

    let mut moved = node.clone();
    moved.parent_id = Some(dest.id);
    moved.name = name.to_string();
    moved.materialized_path = new_prefix.clone();
    moved.container_id = dest.container_id;
    moved.provider = dest.provider.clone();
    moved.modified_at = now;

    let mut updates = vec![moved];
    for child in descendants {
        let rebased = path::rebase(&child.materialized_path, &old_prefix, &new_prefix)
            .ok_or_else(|| {
                AppError::internal(format!(
                    "Descendant {} path {} is not under {}",
                    child.id, child.materialized_path, old_prefix
                ))
            })?;
        if rebased == child.materialized_path
            && child.container_id == dest.container_id
            && child.provider == dest.provider
        {
            continue;
        }
        let mut updated = child.clone();
        updated.materialized_path = rebased;
        updated.container_id = dest.container_id;
        updated.provider = dest.provider.clone();
        updated.modified_at = now;
        updates.push(updated);
    }

    let version_names = if node.is_file() && node.name != name {
        vec![(node.id, name.to_string())]
    } else {
        Vec::new()
    };

    Ok(MovePlan {
        updates,
        region: None,
        version_names,
    })
}

/// Fresh nodes mirroring `node` and its descendants under `dest`, with
/// the root of the copy named `name`. Returns the plan and the mapping
/// from source file ids to copied file ids.
pub(crate) fn plan_copy_nodes(
    node: &FileNode,
    descendants: &[FileNode],
    dest: &FileNode,
    name: &str,
    now: DateTime<Utc>,
) -> AppResult<(CopyPlan, Vec<(NodeId, FileNode)>)> {
    let mut copies: HashMap<NodeId, FileNode> = HashMap::new();
    let mut plan = CopyPlan::default();
    let mut files = Vec::new();

    let mut root = CreateNode::child_of(dest, node.kind, name).into_node(now);
    root.tags = node.tags.clone();
    copies.insert(node.id, root.clone());
    if node.is_file() {
        files.push((node.id, root.clone()));
    }
    plan.nodes.push(root);

    for child in descendants {
        let parent_id = child
            .parent_id
            .ok_or_else(|| AppError::internal(format!("Descendant {} has no parent", child.id)))?;
        let parent = copies.get(&parent_id).ok_or_else(|| {
            AppError::internal(format!("Parent {parent_id} of {} not copied yet", child.id))
        })?;
        let mut copy = CreateNode::child_of(parent, child.kind, child.name.clone()).into_node(now);
        copy.tags = child.tags.clone();
        if child.is_file() {
            files.push((child.id, copy.clone()));
        }
        copies.insert(child.id, copy.clone());
        plan.nodes.push(copy);
    }

    Ok((plan, files))
}

/// Alias the source links onto a copied file, keeping identifiers and
/// binding the version name to the copy's name.
pub(crate) fn alias_links(
    source: &[FileVersionLink],
    copy: &FileNode,
    now: DateTime<Utc>,
) -> Vec<FileVersionLink> {
    source
        .iter()
        .map(|link| FileVersionLink {
            file_id: copy.id,
            version_id: link.version_id,
            identifier: link.identifier,
            version_name: copy.name.clone(),
            download_count: 0,
            created_at: now,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use osfs_core::types::ContainerId;
    use osfs_entity::node::NodeKind;

    fn tree() -> (FileNode, FileNode, FileNode, FileNode) {
        let now = Utc::now();
        let root = CreateNode::root(ContainerId::new(), "osfstorage").into_node(now);
        let folder = CreateNode::child_of(&root, NodeKind::Folder, "docs").into_node(now);
        let sub = CreateNode::child_of(&folder, NodeKind::Folder, "sub").into_node(now);
        let file = CreateNode::child_of(&sub, NodeKind::File, "a.txt").into_node(now);
        (root, folder, sub, file)
    }

    #[test]
    fn test_move_rebases_descendant_paths() {
        let (root, folder, sub, file) = tree();
        let dest = CreateNode::child_of(&root, NodeKind::Folder, "archive").into_node(Utc::now());

        let plan = plan_move(&folder, &[sub, file], &dest, "docs", Utc::now()).unwrap();
        let paths: Vec<&str> = plan
            .updates
            .iter()
            .map(|n| n.materialized_path.as_str())
            .collect();
        assert_eq!(
            paths,
            vec!["/archive/docs/", "/archive/docs/sub/", "/archive/docs/sub/a.txt"]
        );
        assert_eq!(plan.updates[0].parent_id, Some(dest.id));
        assert!(plan.version_names.is_empty());
    }

    #[test]
    fn test_rename_of_file_renames_latest_version() {
        let (_root, _folder, sub, file) = tree();
        let plan = plan_move(&file, &[], &sub, "b.txt", Utc::now()).unwrap();
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].materialized_path, "/docs/sub/b.txt");
        assert_eq!(plan.version_names, vec![(file.id, "b.txt".to_string())]);
    }

    #[test]
    fn test_copy_mirrors_structure_with_new_ids() {
        let (root, folder, sub, file) = tree();
        let (plan, files) =
            plan_copy_nodes(&folder, &[sub.clone(), file.clone()], &root, "docs copy", Utc::now())
                .unwrap();

        assert_eq!(plan.nodes.len(), 3);
        assert!(plan.nodes.iter().all(|n| n.id != folder.id && n.id != sub.id));
        assert_eq!(plan.nodes[2].materialized_path, "/docs copy/sub/a.txt");
        assert_eq!(plan.nodes[2].parent_id, Some(plan.nodes[1].id));
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, file.id);
    }
}
