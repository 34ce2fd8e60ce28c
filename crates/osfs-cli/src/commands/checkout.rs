//! Checkout inspection and bulk release.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use osfs_core::result::AppResult;
use osfs_core::types::{ContainerId, UserId};
use osfs_service::Services;

use crate::output::{self, OutputFormat};

/// Arguments for checkout commands
#[derive(Debug, Args)]
pub struct CheckoutArgs {
    /// Checkout subcommand
    #[command(subcommand)]
    pub command: CheckoutCommand,
}

/// Checkout subcommands
#[derive(Debug, Subcommand)]
pub enum CheckoutCommand {
    /// Files a user holds
    List {
        /// User ID
        #[arg(short, long)]
        user: UserId,
        /// Restrict to one container
        #[arg(short, long)]
        container: Option<ContainerId>,
    },
    /// Check in every file a user holds
    Release {
        /// User ID
        #[arg(short, long)]
        user: UserId,
        /// Restrict to one container
        #[arg(short, long)]
        container: Option<ContainerId>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct CheckoutRow {
    id: String,
    container: String,
    path: String,
    since: String,
}

/// Execute checkout commands.
pub async fn execute(
    args: &CheckoutArgs,
    services: &Services,
    format: OutputFormat,
) -> AppResult<()> {
    match &args.command {
        CheckoutCommand::List { user, container } => {
            let rows: Vec<CheckoutRow> = services
                .checkout
                .checked_out_by(*user, *container)
                .await?
                .iter()
                .map(|f| CheckoutRow {
                    id: f.id.to_string(),
                    container: f.container_id.to_string(),
                    path: f.materialized_path.clone(),
                    since: f.modified_at.format("%Y-%m-%d %H:%M").to_string(),
                })
                .collect();
            output::print_list(&rows, format);
        }
        CheckoutCommand::Release {
            user,
            container,
            yes,
        } => {
            let held = services.checkout.checked_out_by(*user, *container).await?;
            if held.is_empty() {
                output::print_warning(&format!("User {user} holds no checkouts"));
                return Ok(());
            }
            let prompt = format!("Check in {} files held by {user}?", held.len());
            if !super::confirm(&prompt, *yes)? {
                println!("Cancelled.");
                return Ok(());
            }

            let released = services
                .checkout
                .release_user_checkouts(*user, *container)
                .await?;
            output::print_success(&format!("Released {released} of {} checkouts", held.len()));
        }
    }
    Ok(())
}
