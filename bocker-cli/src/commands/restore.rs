//! Restore command handler

use anyhow::{Context, Result};
use bocker_runner::config::{DEFAULT_HOST, DEFAULT_NAMESPACE, RestoreConfig};
use bocker_runner::docker::{ContainerRuntime, DockerCli};
use bocker_runner::postgres::{DatabaseTools, PostgresTools};
use bocker_runner::workflow::{restore_pipeline, restore_tools};
use bocker_runner::RunContext;
use clap::Args;
use colored::*;
use std::sync::Arc;

use super::execute::{execute, preflight};
use crate::config::Config;
use crate::output::OutputFormat;

/// Arguments of `bocker restore`
#[derive(Args)]
pub struct RestoreArgs {
    /// Owner of the restored database, also used to connect
    #[arg(short = 'o', long)]
    pub db_owner: String,

    /// Name of the database the backup was taken from
    #[arg(short = 's', long)]
    pub db_source: String,

    /// Database to restore into
    #[arg(short = 't', long)]
    pub db_target: String,

    /// Database host
    #[arg(long, default_value = DEFAULT_HOST)]
    pub db_host: String,

    /// Backup tag to restore (see `bocker list`)
    #[arg(long)]
    pub tag: String,

    /// Run the PostgreSQL tools inside this container
    #[arg(short = 'c', long)]
    pub container_id: Option<String>,

    /// Registry namespace
    #[arg(short = 'n', long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Repository holding the backup image
    #[arg(short = 'r', long)]
    pub repository: String,

    /// Import cluster roles stored with the backup
    #[arg(long)]
    pub import_roles: bool,
}

impl RestoreArgs {
    pub fn into_config(self) -> RestoreConfig {
        let mut config = RestoreConfig::new(
            self.db_owner,
            self.db_source,
            self.db_target,
            self.repository,
            self.tag,
        )
        .with_host(self.db_host)
        .with_namespace(self.namespace)
        .with_import_roles(self.import_roles);
        if let Some(container) = self.container_id {
            config = config.with_container(container);
        }
        config
    }
}

/// Handle `bocker restore`
pub async fn handle_restore(args: RestoreArgs, config: &Config) -> Result<()> {
    let mut restore = args.into_config();
    if let Some(credentials) = config.login_credentials()? {
        restore = restore.with_credentials(credentials);
    }

    let context = RunContext::new().context("Failed to create working directory")?;
    let docker = DockerCli::with_binary(&config.engine, context.runner());
    let database = match &restore.container {
        Some(container) => PostgresTools::in_container(container, context.runner()),
        None => PostgresTools::local(context.runner()),
    }
    .with_docker_binary(&config.engine);

    preflight(&context, &restore_tools(docker.binary(), &database))?;

    if config.output == OutputFormat::Human {
        println!(
            "{} {} {} {}",
            "Restoring".bold(),
            restore.image().to_string().cyan(),
            "into".dimmed(),
            restore.target.cyan()
        );
    }

    let target = restore.target.clone();
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(docker);
    let database: Arc<dyn DatabaseTools> = Arc::new(database);
    let pipeline = restore_pipeline(&context, restore, runtime, database)?;

    execute(context, pipeline, config.output).await?;

    if config.output == OutputFormat::Human {
        println!("{} Restored {}", "✓".green(), target.bold());
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
        args: RestoreArgs,
    }

    #[test]
    fn test_flags_build_config() {
        let cli = TestCli::parse_from([
            "bocker",
            "-o",
            "app",
            "-s",
            "shop",
            "-t",
            "shop_copy",
            "-r",
            "shop-backups",
            "--tag",
            "2024-01-01_00-00-00",
            "--import-roles",
        ]);

        let config = cli.args.into_config();

        assert_eq!(config.owner(), "app");
        assert_eq!(config.target, "shop_copy");
        assert_eq!(config.container, None);
        assert!(config.import_roles);
        assert_eq!(
            config.image().to_string(),
            "bueti/shop-backups:2024-01-01_00-00-00"
        );
    }

    #[test]
    fn test_tag_is_required() {
        let result = TestCli::try_parse_from([
            "bocker", "-o", "app", "-s", "shop", "-t", "copy", "-r", "shop-backups",
        ]);
        assert!(result.is_err());
    }
}
