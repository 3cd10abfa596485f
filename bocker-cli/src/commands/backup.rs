//! Backup command handlers
//!
//! `bocker backup` dumps a database and pushes it as an image; `bocker backup
//! list` is an alias for `bocker list`.

use anyhow::{Context, Result};
use bocker_runner::config::{BackupConfig, DEFAULT_HOST, DEFAULT_NAMESPACE};
use bocker_runner::docker::{ContainerRuntime, DockerCli};
use bocker_runner::postgres::{DatabaseTools, PostgresTools};
use bocker_runner::workflow::{backup_pipeline, backup_tools};
use bocker_runner::RunContext;
use clap::{Args, Subcommand};
use colored::*;
use std::sync::Arc;

use super::execute::{execute, preflight};
use super::list::ListArgs;
use crate::config::Config;
use crate::output::OutputFormat;

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// List available backups
    List(ListArgs),
}

/// Arguments of `bocker backup`
///
/// Optional at the parser level so `bocker backup list` parses without them.
#[derive(Args)]
pub struct BackupArgs {
    /// Database user
    #[arg(short = 'u', long)]
    pub db_user: Option<String>,

    /// Database host
    #[arg(long, default_value = DEFAULT_HOST)]
    pub db_host: String,

    /// Database to back up
    #[arg(short = 's', long)]
    pub db_source: Option<String>,

    /// Run the PostgreSQL tools inside this container
    #[arg(short = 'c', long)]
    pub container_id: Option<String>,

    /// Registry namespace
    #[arg(short = 'n', long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Repository the backup image is pushed to
    #[arg(short = 'r', long)]
    pub repository: Option<String>,

    /// Also export cluster roles
    #[arg(long)]
    pub export_roles: bool,
}

impl BackupArgs {
    /// Builds the runner configuration from the parsed flags
    pub fn into_config(self) -> Result<BackupConfig> {
        let user = self.db_user.context("--db-user is required")?;
        let source = self.db_source.context("--db-source is required")?;
        let repository = self.repository.context("--repository is required")?;

        let mut config = BackupConfig::new(user, source, repository)
            .with_host(self.db_host)
            .with_namespace(self.namespace)
            .with_export_roles(self.export_roles);
        if let Some(container) = self.container_id {
            config = config.with_container(container);
        }
        Ok(config)
    }
}

/// Handle `bocker backup`
pub async fn handle_backup(args: BackupArgs, config: &Config) -> Result<()> {
    let mut backup = args.into_config()?;
    if let Some(credentials) = config.login_credentials()? {
        backup = backup.with_credentials(credentials);
    }

    let context = RunContext::new().context("Failed to create working directory")?;
    let docker = DockerCli::with_binary(&config.engine, context.runner());
    let database = match &backup.container {
        Some(container) => PostgresTools::in_container(container, context.runner()),
        None => PostgresTools::local(context.runner()),
    }
    .with_docker_binary(&config.engine);

    preflight(&context, &backup_tools(&backup, docker.binary(), &database))?;

    if config.output == OutputFormat::Human {
        println!(
            "{} {} {} {}",
            "Backing up".bold(),
            backup.source.cyan(),
            "to".dimmed(),
            backup.image().to_string().cyan()
        );
    }

    let image = backup.image();
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(docker);
    let database: Arc<dyn DatabaseTools> = Arc::new(database);
    let pipeline = backup_pipeline(&context, backup, runtime, database)?;

    execute(context, pipeline, config.output).await?;

    if config.output == OutputFormat::Human {
        println!("{} Pushed {}", "✓".green(), image.to_string().bold());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: BackupArgs,
    }

    #[test]
    fn test_flags_build_config() {
        let cli = TestCli::parse_from([
            "bocker", "-u", "postgres", "-s", "shop", "-r", "shop-backups", "-c", "pg-main",
            "--export-roles",
        ]);

        let config = cli.args.into_config().unwrap();

        assert_eq!(config.connection.user, "postgres");
        assert_eq!(config.connection.host, "localhost");
        assert_eq!(config.namespace, "bueti");
        assert_eq!(config.container.as_deref(), Some("pg-main"));
        assert!(config.export_roles);
        assert_eq!(config.naming.source(), "shop");
    }

    #[test]
    fn test_missing_source_is_reported() {
        let cli = TestCli::parse_from(["bocker", "-u", "postgres", "-r", "shop-backups"]);
        let err = cli.args.into_config().unwrap_err();
        assert!(err.to_string().contains("--db-source"));
    }
}
