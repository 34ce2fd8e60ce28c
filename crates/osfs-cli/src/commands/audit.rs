//! Audit log listing.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use osfs_core::result::AppResult;
use osfs_core::types::{ContainerId, PageRequest};
use osfs_database::DatabasePool;

use crate::output::{self, OutputFormat};

/// Arguments for the audit command
#[derive(Debug, Args)]
pub struct AuditArgs {
    /// Container ID
    #[arg(short, long)]
    pub container: ContainerId,
    /// Page number
    #[arg(long, default_value = "1")]
    pub page: u64,
    /// Page size
    #[arg(long, default_value = "50")]
    pub page_size: u64,
}

#[derive(Debug, Serialize, Tabled)]
struct AuditRow {
    at: String,
    action: String,
    user: String,
    path: String,
}

/// Execute the audit command.
pub async fn execute(args: &AuditArgs, pool: &DatabasePool, format: OutputFormat) -> AppResult<()> {
    let log = pool.audit_log();
    let page = log
        .list_for_container(args.container, PageRequest::new(args.page, args.page_size))
        .await?;

    let rows: Vec<AuditRow> = page
        .items
        .iter()
        .map(|e| AuditRow {
            at: e.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            action: e.action.clone(),
            user: e.user_id.map(|u| u.to_string()).unwrap_or_else(|| "system".to_string()),
            path: e.params["path"].as_str().unwrap_or_default().to_string(),
        })
        .collect();
    output::print_list(&rows, format);
    Ok(())
}
