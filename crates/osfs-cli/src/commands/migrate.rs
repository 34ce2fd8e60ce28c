//! Database migration commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use osfs_core::result::AppResult;
use osfs_database::DatabasePool;
use osfs_database::migration;

use crate::output::{self, OutputFormat};

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Apply all pending migrations
    Run,
    /// Show which migrations are applied
    Status,
}

#[derive(Debug, Serialize, Tabled)]
struct MigrationRow {
    version: i64,
    description: String,
    applied: bool,
}

/// Execute migration commands.
pub async fn execute(args: &MigrateArgs, pool: &DatabasePool, format: OutputFormat) -> AppResult<()> {
    match &args.command {
        MigrateCommand::Run => {
            println!("Running database migrations...");
            migration::run_migrations(pool.pool()).await?;
            output::print_success("All migrations applied.");
        }
        MigrateCommand::Status => {
            let rows: Vec<MigrationRow> = migration::migration_status(pool.pool())
                .await?
                .into_iter()
                .map(|m| MigrationRow {
                    version: m.version,
                    description: m.description,
                    applied: m.applied,
                })
                .collect();
            output::print_list(&rows, format);
            if rows.iter().any(|r| !r.applied) {
                output::print_warning("There are pending migrations; run `osfs-cli migrate run`.");
            }
        }
    }
    Ok(())
}
