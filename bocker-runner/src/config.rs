//! Workflow configuration
//!
//! Parameters for a single backup or restore run. The CLI builds these from
//! flags and the credentials file; the workflows validate them before any
//! stage is assembled.

use bocker_core::domain::backup::BackupNaming;
use bocker_core::domain::credentials::RegistryCredentials;
use bocker_core::domain::image::ImageReference;
use bocker_core::{Error, Result};

/// Database host used when none is given
pub const DEFAULT_HOST: &str = "localhost";

/// Docker Hub namespace used when none is given
pub const DEFAULT_NAMESPACE: &str = "bueti";

/// Database role and host used for every client tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub user: String,
    pub host: String,
}

impl Connection {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            host: DEFAULT_HOST.to_string(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }
}

/// Backup workflow configuration
#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub connection: Connection,

    /// Database to dump
    pub source: String,

    pub namespace: String,
    pub repository: String,

    /// File names and image tag for this run
    pub naming: BackupNaming,

    /// Run the database tools inside this container
    pub container: Option<String>,

    /// Also dump cluster-wide roles
    pub export_roles: bool,

    /// Registry login before push; skipped when absent
    pub credentials: Option<RegistryCredentials>,
}

impl BackupConfig {
    /// Creates a configuration stamped with the current local time
    pub fn new(
        user: impl Into<String>,
        source: impl Into<String>,
        repository: impl Into<String>,
    ) -> Self {
        let source = source.into();
        Self {
            connection: Connection::new(user),
            naming: BackupNaming::now(source.clone()),
            source,
            namespace: DEFAULT_NAMESPACE.to_string(),
            repository: repository.into(),
            container: None,
            export_roles: false,
            credentials: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.connection.host = host.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Overrides the generated naming, e.g. to pin the timestamp
    pub fn with_naming(mut self, naming: BackupNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn with_export_roles(mut self, export_roles: bool) -> Self {
        self.export_roles = export_roles;
        self
    }

    pub fn with_credentials(mut self, credentials: RegistryCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Image the backup is pushed as; the tag is the run timestamp
    pub fn image(&self) -> ImageReference {
        ImageReference::new(&self.namespace, &self.repository, self.naming.timestamp())
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        require("database user", &self.connection.user)?;
        require("database host", &self.connection.host)?;
        require("source database", &self.source)?;
        require("namespace", &self.namespace)?;
        require("repository", &self.repository)?;
        if self.naming.source() != self.source {
            return Err(Error::missing(format!(
                "backup naming for source database '{}'",
                self.source
            )));
        }
        validate_container(self.container.as_deref())?;
        validate_credentials(self.credentials.as_ref())
    }
}

/// Restore workflow configuration
#[derive(Debug, Clone)]
pub struct RestoreConfig {
    /// `user` is the owner of the restored database
    pub connection: Connection,

    /// Database the backup was taken from
    pub source: String,

    /// Database to create and restore into
    pub target: String,

    pub namespace: String,
    pub repository: String,

    /// Timestamp tag of the backup image
    pub tag: String,

    pub container: Option<String>,

    /// Apply the roles file shipped in the image
    pub import_roles: bool,

    /// Registry login before pull; skipped when absent
    pub credentials: Option<RegistryCredentials>,
}

impl RestoreConfig {
    pub fn new(
        owner: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        repository: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            connection: Connection::new(owner),
            source: source.into(),
            target: target.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            repository: repository.into(),
            tag: tag.into(),
            container: None,
            import_roles: false,
            credentials: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.connection.host = host.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn with_import_roles(mut self, import_roles: bool) -> Self {
        self.import_roles = import_roles;
        self
    }

    pub fn with_credentials(mut self, credentials: RegistryCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn owner(&self) -> &str {
        &self.connection.user
    }

    pub fn image(&self) -> ImageReference {
        ImageReference::new(&self.namespace, &self.repository, &self.tag)
    }

    /// File names inside the backup image
    pub fn naming(&self) -> BackupNaming {
        BackupNaming::new(&self.source, &self.tag)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        require("database owner", &self.connection.user)?;
        require("database host", &self.connection.host)?;
        require("source database", &self.source)?;
        require("target database", &self.target)?;
        require("namespace", &self.namespace)?;
        require("repository", &self.repository)?;
        require("backup tag", &self.tag)?;
        validate_container(self.container.as_deref())?;
        validate_credentials(self.credentials.as_ref())
    }
}

fn require(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::missing(what));
    }
    Ok(())
}

fn validate_container(container: Option<&str>) -> Result<()> {
    match container {
        Some(id) => require("container id", id),
        None => Ok(()),
    }
}

fn validate_credentials(credentials: Option<&RegistryCredentials>) -> Result<()> {
    match credentials {
        Some(c) if !c.is_complete() => Err(Error::missing("registry username and password")),
        _ => Ok(()),
    }
}
