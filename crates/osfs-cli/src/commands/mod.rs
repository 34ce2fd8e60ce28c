//! CLI command definitions and dispatch.

pub mod audit;
pub mod checkout;
pub mod migrate;
pub mod trash;
pub mod tree;
pub mod usage;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use osfs_core::config::AppConfig;
use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_database::DatabasePool;
use osfs_service::{NoPrimaryFiles, NoopTasks, ServiceDeps, Services};

use crate::output::OutputFormat;

/// osfstorage file-node administration
#[derive(Debug, Parser)]
#[command(name = "osfs", version, about, long_about = None)]
pub struct Cli {
    /// Directory holding `default.toml` and the per-environment overlays
    #[arg(short, long, default_value = "config")]
    pub config: String,

    /// Environment overlay to load
    #[arg(short, long, default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Print a container's file tree
    Tree(tree::TreeArgs),
    /// Inspect and restore trashed nodes
    Trash(trash::TrashArgs),
    /// Inspect and release checkouts
    Checkout(checkout::CheckoutArgs),
    /// Storage used by a container
    Usage(usage::UsageArgs),
    /// Audit log of a container
    Audit(audit::AuditArgs),
}

impl Cli {
    /// Execute the selected command.
    pub async fn execute(&self) -> AppResult<()> {
        let config = AppConfig::load_from(&self.config, &self.env)?;
        let pool = DatabasePool::connect(&config.database).await?;

        let result = match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &pool, self.format).await,
            Commands::Tree(args) => {
                tree::execute(args, &services(&config, &pool), self.format).await
            }
            Commands::Trash(args) => {
                trash::execute(args, &services(&config, &pool), self.format).await
            }
            Commands::Checkout(args) => {
                checkout::execute(args, &services(&config, &pool), self.format).await
            }
            Commands::Usage(args) => {
                usage::execute(args, &services(&config, &pool), self.format).await
            }
            Commands::Audit(args) => audit::execute(args, &pool, self.format).await,
        };

        pool.close().await;
        result
    }
}

/// The engine over PostgreSQL. Background tasks are dropped: the CLI
/// does its work inline.
fn services(config: &AppConfig, pool: &DatabasePool) -> Services {
    Services::new(ServiceDeps {
        store: Arc::new(pool.store()),
        audit: Arc::new(pool.audit_log()),
        primary: Arc::new(NoPrimaryFiles),
        tasks: Arc::new(NoopTasks),
        storage: config.storage.clone(),
        conflict_retries: config.database.conflict_retries,
    })
}

/// Ask before a destructive step unless `--yes` was given.
pub(crate) fn confirm(prompt: &str, assume_yes: bool) -> AppResult<bool> {
    if assume_yes {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| AppError::internal(format!("Input error: {e}")))
}
