//! Storage usage of a container.

use clap::Args;
use serde_json::json;

use osfs_core::result::AppResult;
use osfs_core::types::ContainerId;
use osfs_service::Services;

use crate::output::{self, OutputFormat};

/// Arguments for the usage command
#[derive(Debug, Args)]
pub struct UsageArgs {
    /// Container ID
    #[arg(short, long)]
    pub container: ContainerId,
}

/// Execute the usage command.
pub async fn execute(args: &UsageArgs, services: &Services, format: OutputFormat) -> AppResult<()> {
    let bytes = services.versions.container_usage(args.container).await?;
    match format {
        OutputFormat::Json => output::print_json(&json!({
            "container_id": args.container,
            "bytes": bytes,
        })),
        OutputFormat::Table => {
            output::print_kv("Container", &args.container.to_string());
            output::print_kv("Usage", &output::human_bytes(bytes));
            output::print_kv("Bytes", &bytes.to_string());
        }
    }
    Ok(())
}
