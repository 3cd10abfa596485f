//! Bocker CLI
//!
//! Back up a PostgreSQL database into a container image and restore it.

mod commands;
mod config;
mod output;

use anyhow::Result;
use bocker_client::DEFAULT_HUB_URL;
use bocker_runner::docker::DEFAULT_BINARY;
use clap::Parser;
use commands::{Commands, handle_command};
use config::{Config, default_credentials_path};
use output::OutputFormat;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bocker")]
#[command(about = "Back up databases into container images", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Progress and listing format
    #[arg(long, global = true, value_enum, default_value = "human")]
    output: OutputFormat,

    /// Docker Hub API URL
    #[arg(long, global = true, env = "BOCKER_HUB_URL", default_value = DEFAULT_HUB_URL)]
    hub_url: String,

    /// Container engine binary
    #[arg(long, global = true, env = "BOCKER_ENGINE", default_value = DEFAULT_BINARY)]
    engine: String,

    /// Credentials file
    #[arg(long, global = true, env = "BOCKER_CONFIG")]
    config: Option<PathBuf>,

    /// Registry username, overrides the credentials file
    #[arg(long, global = true, env = "DOCKER_USERNAME")]
    registry_username: Option<String>,

    /// Registry password or token, overrides the credentials file
    #[arg(long, global = true, env = "DOCKER_PAT", hide_env_values = true)]
    registry_password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "bocker=debug" } else { "bocker=warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config {
        hub_url: cli.hub_url,
        engine: cli.engine,
        output: cli.output,
        credentials_path: cli.config.unwrap_or_else(default_credentials_path),
        username: cli.registry_username,
        password: cli.registry_password,
    };

    handle_command(cli.command, &config).await
}
