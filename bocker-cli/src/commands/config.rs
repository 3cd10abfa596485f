//! Config command handlers

use anyhow::Result;
use clap::Subcommand;
use colored::*;

use crate::config::{Config, CredentialsFile};

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Store Docker Hub credentials
    Set {
        /// Docker Hub username
        #[arg(short, long)]
        username: Option<String>,

        /// Docker Hub password or personal access token
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Show stored credentials
    List,
}

/// Handle config commands
pub fn handle_config_command(command: ConfigCommands, config: &Config) -> Result<()> {
    let file = CredentialsFile::new(&config.credentials_path);

    match command {
        ConfigCommands::Set { username, password } => {
            if username.is_none() && password.is_none() {
                anyhow::bail!("Nothing to set; pass --username and/or --password");
            }

            let mut credentials = file.load()?;
            if let Some(username) = username {
                credentials.username = username;
            }
            if let Some(password) = password {
                credentials.password = password;
            }
            file.save(&credentials)?;

            println!(
                "{} Saved credentials to {}",
                "✓".green(),
                file.path().display().to_string().dimmed()
            );
        }
        ConfigCommands::List => {
            let credentials = file.load()?;
            println!("{}", file.path().display().to_string().dimmed());
            println!("  {} {}", "username:".bold(), credentials.username);
            println!("  {} {}", "password:".bold(), credentials.masked_password());
        }
    }

    Ok(())
}
