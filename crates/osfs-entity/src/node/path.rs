//! Materialized path helpers.

use super::model::NodeKind;

/// Path of a child named `name` under a folder whose path is `parent_path`.
pub fn child_path(parent_path: &str, name: &str, kind: NodeKind) -> String {
    let mut path = String::with_capacity(parent_path.len() + name.len() + 2);
    path.push_str(parent_path);
    if !path.ends_with('/') {
        path.push('/');
    }
    path.push_str(name);
    if kind == NodeKind::Folder {
        path.push('/');
    }
    path
}

/// Rewrite `path` so that the `old_prefix` it starts with becomes `new_prefix`.
///
/// Returns `None` when `path` is not under `old_prefix`.
pub fn rebase(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    path.strip_prefix(old_prefix)
        .map(|rest| format!("{new_prefix}{rest}"))
}

/// Split a materialized path into its non-empty segments.
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_path() {
        assert_eq!(child_path("/", "a", NodeKind::Folder), "/a/");
        assert_eq!(child_path("/a/", "b.txt", NodeKind::File), "/a/b.txt");
        assert_eq!(child_path("/a", "b", NodeKind::Folder), "/a/b/");
    }

    #[test]
    fn test_rebase() {
        assert_eq!(
            rebase("/old/sub/f.txt", "/old/", "/new/").as_deref(),
            Some("/new/sub/f.txt")
        );
        assert_eq!(rebase("/other/f", "/old/", "/new/"), None);
    }

    #[test]
    fn test_segments() {
        assert_eq!(segments("/a/b/c.txt"), vec!["a", "b", "c.txt"]);
        assert!(segments("/").is_empty());
    }
}
