//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod backup;
mod config;
mod execute;
mod list;
mod restore;

pub use backup::{BackupArgs, BackupCommands};
pub use config::ConfigCommands;
pub use list::ListArgs;
pub use restore::RestoreArgs;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Dump a database and push it as an image
    #[command(args_conflicts_with_subcommands = true)]
    Backup {
        #[command(subcommand)]
        command: Option<BackupCommands>,

        #[command(flatten)]
        args: BackupArgs,
    },
    /// Restore a database from a backup image
    Restore(RestoreArgs),
    /// List available backups
    List(ListArgs),
    /// Manage stored registry credentials
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Backup {
            command: Some(BackupCommands::List(args)),
            ..
        } => list::handle_list(args, config).await,
        Commands::Backup { command: None, args } => backup::handle_backup(args, config).await,
        Commands::Restore(args) => restore::handle_restore(args, config).await,
        Commands::List(args) => list::handle_list(args, config).await,
        Commands::Config { command } => config::handle_config_command(command, config),
    }
}
