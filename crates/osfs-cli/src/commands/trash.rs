//! Trash listing and restore.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use osfs_core::result::AppResult;
use osfs_core::types::{ContainerId, NodeId, PageRequest};
use osfs_entity::node::TrashedFileNode;
use osfs_service::{RequestContext, Services};

use crate::output::{self, OutputFormat};

/// Arguments for trash commands
#[derive(Debug, Args)]
pub struct TrashArgs {
    /// Trash subcommand
    #[command(subcommand)]
    pub command: TrashCommand,
}

/// Trash subcommands
#[derive(Debug, Subcommand)]
pub enum TrashCommand {
    /// List a container's trash, most recent first
    List {
        /// Container ID
        #[arg(short, long)]
        container: ContainerId,
        /// Page number
        #[arg(long, default_value = "1")]
        page: u64,
        /// Page size
        #[arg(long, default_value = "50")]
        page_size: u64,
    },
    /// Restore a trashed node and everything deleted with it
    Restore {
        /// Node ID
        node: NodeId,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct TrashRow {
    id: String,
    kind: String,
    path: String,
    deleted_on: String,
    deleted_by: String,
}

impl From<&TrashedFileNode> for TrashRow {
    fn from(t: &TrashedFileNode) -> Self {
        Self {
            id: t.id().to_string(),
            kind: t.node.kind.to_string(),
            path: t.node.materialized_path.clone(),
            deleted_on: t.deleted_on.format("%Y-%m-%d %H:%M").to_string(),
            deleted_by: t.deleted_by.map(|u| u.to_string()).unwrap_or_default(),
        }
    }
}

/// Execute trash commands.
pub async fn execute(args: &TrashArgs, services: &Services, format: OutputFormat) -> AppResult<()> {
    match &args.command {
        TrashCommand::List {
            container,
            page,
            page_size,
        } => {
            let listing = services
                .trash
                .list_trash(*container, PageRequest::new(*page, *page_size))
                .await?;
            let rows: Vec<TrashRow> = listing.items.iter().map(TrashRow::from).collect();
            output::print_list(&rows, format);
            if format == OutputFormat::Table {
                println!(
                    "Page {} ({} trashed nodes in total)",
                    listing.page, listing.total_items
                );
            }
        }
        TrashCommand::Restore { node, yes } => {
            let trashed = services.tree.get_trashed(*node).await?;
            let prompt = format!("Restore {} and its deleted contents?", trashed.node.materialized_path);
            if !super::confirm(&prompt, *yes)? {
                println!("Cancelled.");
                return Ok(());
            }

            let restored = services.trash.restore(&RequestContext::system(), *node).await?;
            output::print_success(&format!("Restored to {}", restored.materialized_path));
        }
    }
    Ok(())
}
