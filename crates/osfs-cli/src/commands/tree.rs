//! Print a container's tree.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_core::types::ContainerId;
use osfs_entity::node::{FileNode, path};
use osfs_service::Services;

use crate::output::{self, OutputFormat};

/// Arguments for the tree command
#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Container ID
    #[arg(short, long)]
    pub container: ContainerId,
    /// Provider whose root is printed (defaults to the configured one)
    #[arg(short, long)]
    pub provider: Option<String>,
    /// Deepest level printed
    #[arg(short, long, default_value = "8")]
    pub depth: usize,
}

#[derive(Debug, Serialize, Tabled)]
struct NodeRow {
    id: String,
    kind: String,
    path: String,
    checkout: String,
}

impl From<&FileNode> for NodeRow {
    fn from(node: &FileNode) -> Self {
        Self {
            id: node.id.to_string(),
            kind: node.kind.to_string(),
            path: node.materialized_path.clone(),
            checkout: node.checkout.map(|u| u.to_string()).unwrap_or_default(),
        }
    }
}

/// Execute the tree command.
pub async fn execute(args: &TreeArgs, services: &Services, format: OutputFormat) -> AppResult<()> {
    let provider = args
        .provider
        .as_deref()
        .unwrap_or(&services.tree.storage().default_provider);
    let root = services
        .tree
        .resolve_path(args.container, Some(provider), "/")
        .await
        .map_err(|e| {
            if e.is(osfs_core::error::ErrorKind::NotFound) {
                AppError::not_found(format!(
                    "Container {} has no {provider} tree yet",
                    args.container
                ))
            } else {
                e
            }
        })?;

    let nodes: Vec<FileNode> = services
        .tree
        .descendants(&root)
        .await?
        .into_iter()
        .filter(|n| path::segments(&n.materialized_path).len() <= args.depth)
        .collect();

    match format {
        OutputFormat::Json => {
            let rows: Vec<NodeRow> = nodes.iter().map(NodeRow::from).collect();
            output::print_list(&rows, format);
        }
        OutputFormat::Table => {
            println!("/ ({})", root.id);
            let mut sorted = nodes;
            sorted.sort_by(|a, b| a.materialized_path.cmp(&b.materialized_path));
            for node in &sorted {
                let depth = path::segments(&node.materialized_path).len();
                let indent = "  ".repeat(depth.saturating_sub(1));
                let suffix = if node.is_folder() { "/" } else { "" };
                let lock = if node.is_checked_out() { " [checked out]" } else { "" };
                println!("{indent}├── {}{suffix}{lock}", node.name);
            }
        }
    }
    Ok(())
}
