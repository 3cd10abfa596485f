//! List command handler
//!
//! Prints the tags of a backup repository on Docker Hub.

use anyhow::{Context, Result};
use bocker_client::{BackupCatalog, HubClient};
use bocker_core::dto::hub::TagSummary;
use bocker_runner::config::DEFAULT_NAMESPACE;
use clap::Args;
use colored::*;

use crate::config::Config;
use crate::output::OutputFormat;

/// Arguments of `bocker list`
#[derive(Args)]
pub struct ListArgs {
    /// Registry namespace
    #[arg(short = 'n', long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Repository holding the backups
    #[arg(short = 'r', long)]
    pub repository: String,
}

/// Handle `bocker list`
pub async fn handle_list(args: ListArgs, config: &Config) -> Result<()> {
    let credentials = config.credentials()?;
    if !credentials.is_complete() {
        anyhow::bail!(
            "Docker Hub credentials are missing; run `bocker config set` or set DOCKER_USERNAME and DOCKER_PAT"
        );
    }

    let client = HubClient::new(&config.hub_url);
    let tags = client
        .list_backups(&credentials, &args.namespace, &args.repository)
        .await
        .with_context(|| format!("Failed to list {}/{}", args.namespace, args.repository))?;

    match config.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tags)?),
        OutputFormat::Human => print_tags(&args, &tags),
    }

    Ok(())
}

fn print_tags(args: &ListArgs, tags: &[TagSummary]) {
    if tags.is_empty() {
        println!(
            "{}",
            format!("No backups found in {}/{}", args.namespace, args.repository).dimmed()
        );
        return;
    }

    println!(
        "{}",
        format!("Backups in {}/{}:", args.namespace, args.repository).bold()
    );
    println!(
        "  {:<22} {:<22} {:>12}  {}",
        "TAG".bold(),
        "LAST UPDATED".bold(),
        "SIZE".bold(),
        "UPDATED BY".bold()
    );
    for tag in tags {
        println!("  {}", format_row(tag));
    }
}

/// One listing row: tag, update time, size in MiB and updater
fn format_row(tag: &TagSummary) -> String {
    let updated = tag
        .last_updated
        .map(|t| t.format("%d %b %Y %H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<22} {:<22} {:>12}  {}",
        tag.name,
        updated,
        format!("{:.2} MiB", tag.size_mib()),
        tag.last_updater_username.as_deref().unwrap_or("-")
    )
}
