//! Configuration module
//!
//! Handles CLI settings and the persisted registry credentials file.

use anyhow::{Context, Result};
use bocker_core::domain::credentials::RegistryCredentials;
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

/// CLI configuration
#[derive(Clone)]
pub struct Config {
    /// Docker Hub API base URL
    pub hub_url: String,

    /// Container engine binary (`docker` or `podman`)
    pub engine: String,

    /// Progress and listing output format
    pub output: OutputFormat,

    /// Location of the credentials file
    pub credentials_path: PathBuf,

    /// Environment overrides for the stored username and password
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Config {
    /// Stored credentials with environment overrides applied
    pub fn credentials(&self) -> Result<RegistryCredentials> {
        let stored = CredentialsFile::new(&self.credentials_path).load()?;
        Ok(with_overrides(
            stored,
            self.username.clone(),
            self.password.clone(),
        ))
    }

    /// Credentials for registry login, if both parts are known
    pub fn login_credentials(&self) -> Result<Option<RegistryCredentials>> {
        let credentials = self.credentials()?;
        Ok(credentials.is_complete().then_some(credentials))
    }
}

/// `<config dir>/bocker/config.yaml`
pub fn default_credentials_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bocker")
        .join("config.yaml")
}

/// Replaces stored values with non-empty overrides
pub fn with_overrides(
    mut credentials: RegistryCredentials,
    username: Option<String>,
    password: Option<String>,
) -> RegistryCredentials {
    if let Some(username) = username.filter(|u| !u.is_empty()) {
        credentials.username = username;
    }
    if let Some(password) = password.filter(|p| !p.is_empty()) {
        credentials.password = password;
    }
    credentials
}

/// YAML file holding the registry username and password
pub struct CredentialsFile {
    path: PathBuf,
}

impl CredentialsFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file; a missing file yields empty credentials
    pub fn load(&self) -> Result<RegistryCredentials> {
        if !self.path.exists() {
            return Ok(RegistryCredentials::default());
        }

        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(RegistryCredentials::default());
        }

        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    /// Writes the file, creating its directory
    pub fn save(&self, credentials: &RegistryCredentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let contents = serde_yaml::to_string(credentials).context("Failed to encode credentials")?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to restrict {}", self.path.display()))?;
        }

        Ok(())
    }
}
