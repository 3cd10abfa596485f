//! PostgreSQL client tools
//!
//! Wraps `pg_dump`, `pg_dumpall`, `psql` and `pg_restore`. Tools run on the
//! host, or inside a database container through `docker exec`, in which
//! case every file argument is rewritten to live in [`CONTAINER_DIR`].

use bocker_core::{Error, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::config::Connection;
use crate::docker::DEFAULT_BINARY;
use crate::process::ToolRunner;

/// Directory inside a database container that holds transferred files
pub const CONTAINER_DIR: &str = "/var/tmp";

const ALREADY_EXISTS: &str = "already exists";
const ERRORS_IGNORED: &str = "errors ignored on restore";

/// Database operations the workflows need
///
/// `create_database` and `restore` return `SoftConflict` for outcomes the
/// workflows tolerate.
pub trait DatabaseTools: Send + Sync {
    /// Writes a custom-format dump of `database` to `file`
    fn dump(&self, connection: &Connection, database: &str, file: &Path) -> Result<()>;

    /// Writes cluster-wide roles as SQL to `file`
    fn export_roles(&self, connection: &Connection, file: &Path) -> Result<()>;

    fn create_database(&self, connection: &Connection, database: &str, owner: &str) -> Result<()>;

    /// Applies a roles SQL file
    fn import_roles(&self, connection: &Connection, file: &Path) -> Result<()>;

    /// Restores a custom-format dump into `database`, cleaning existing objects
    fn restore(&self, connection: &Connection, database: &str, file: &Path) -> Result<()>;

    /// Binaries that must be installed on the host
    fn required_tools(&self, tools: &[&str]) -> Vec<String>;
}

/// Where the PostgreSQL client tools run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    Local,
    /// Through `docker exec` in the named container
    Container(String),
}

/// DatabaseTools backed by the PostgreSQL client binaries
#[derive(Clone)]
pub struct PostgresTools {
    location: DatabaseLocation,
    docker_binary: String,
    runner: ToolRunner,
}

impl PostgresTools {
    pub fn local(runner: ToolRunner) -> Self {
        Self {
            location: DatabaseLocation::Local,
            docker_binary: DEFAULT_BINARY.to_string(),
            runner,
        }
    }

    pub fn in_container(container: impl Into<String>, runner: ToolRunner) -> Self {
        Self {
            location: DatabaseLocation::Container(container.into()),
            docker_binary: DEFAULT_BINARY.to_string(),
            runner,
        }
    }

    /// Container engine used for `exec` in container mode
    pub fn with_docker_binary(mut self, binary: impl Into<String>) -> Self {
        self.docker_binary = binary.into();
        self
    }

    pub fn location(&self) -> &DatabaseLocation {
        &self.location
    }

    /// Path of `file` as seen by the tool
    fn resolve(&self, file: &Path) -> String {
        match &self.location {
            DatabaseLocation::Local => file.display().to_string(),
            DatabaseLocation::Container(_) => container_path(file),
        }
    }

    /// Program and full argument list for running `tool` at this location
    fn command(&self, tool: &str, args: Vec<String>) -> (String, Vec<String>) {
        match &self.location {
            DatabaseLocation::Local => (tool.to_string(), args),
            DatabaseLocation::Container(id) => {
                let mut full = vec!["exec".to_string(), id.clone(), tool.to_string()];
                full.extend(args);
                (self.docker_binary.clone(), full)
            }
        }
    }

    fn execute(&self, tool: &str, args: Vec<String>) -> Result<String> {
        let (program, args) = self.command(tool, args);
        debug!("Running {} via {}", tool, program);
        self.runner.run(&program, &args)
    }

    fn dump_args(connection: &Connection, database: &str, file: String) -> Vec<String> {
        vec![
            "-F".to_string(),
            "c".to_string(),
            "-U".to_string(),
            connection.user.clone(),
            "-h".to_string(),
            connection.host.clone(),
            database.to_string(),
            "-f".to_string(),
            file,
        ]
    }

    fn export_roles_args(connection: &Connection, file: String) -> Vec<String> {
        vec![
            "-U".to_string(),
            connection.user.clone(),
            "-h".to_string(),
            connection.host.clone(),
            "--clean".to_string(),
            "--if-exists".to_string(),
            "--no-comments".to_string(),
            "--globals-only".to_string(),
            format!("--file={}", file),
        ]
    }

    fn create_database_args(connection: &Connection, database: &str, owner: &str) -> Vec<String> {
        vec![
            "-U".to_string(),
            connection.user.clone(),
            "-h".to_string(),
            connection.host.clone(),
            "-d".to_string(),
            "postgres".to_string(),
            "-c".to_string(),
            format!(
                "CREATE DATABASE {} OWNER {} ENCODING 'UTF8'",
                quote_ident(database),
                quote_ident(owner)
            ),
        ]
    }

    fn import_roles_args(connection: &Connection, file: String) -> Vec<String> {
        vec![
            "-U".to_string(),
            connection.user.clone(),
            "-h".to_string(),
            connection.host.clone(),
            "-d".to_string(),
            "postgres".to_string(),
            "-f".to_string(),
            file,
        ]
    }

    fn restore_args(connection: &Connection, database: &str, file: String) -> Vec<String> {
        vec![
            "-U".to_string(),
            connection.user.clone(),
            "-F".to_string(),
            "c".to_string(),
            "-c".to_string(),
            "-v".to_string(),
            format!("--dbname={}", database),
            "-h".to_string(),
            connection.host.clone(),
            file,
        ]
    }
}

impl DatabaseTools for PostgresTools {
    fn dump(&self, connection: &Connection, database: &str, file: &Path) -> Result<()> {
        info!("Dumping database {} on {}", database, connection.host);
        self.execute(
            "pg_dump",
            Self::dump_args(connection, database, self.resolve(file)),
        )?;
        Ok(())
    }

    fn export_roles(&self, connection: &Connection, file: &Path) -> Result<()> {
        info!("Exporting roles from {}", connection.host);
        self.execute(
            "pg_dumpall",
            Self::export_roles_args(connection, self.resolve(file)),
        )?;
        Ok(())
    }

    fn create_database(&self, connection: &Connection, database: &str, owner: &str) -> Result<()> {
        info!("Creating database {} owned by {}", database, owner);
        self.execute(
            "psql",
            Self::create_database_args(connection, database, owner),
        )
        .map_err(|e| soften(e, ALREADY_EXISTS))?;
        Ok(())
    }

    fn import_roles(&self, connection: &Connection, file: &Path) -> Result<()> {
        info!("Importing roles into {}", connection.host);
        self.execute(
            "psql",
            Self::import_roles_args(connection, self.resolve(file)),
        )?;
        Ok(())
    }

    fn restore(&self, connection: &Connection, database: &str, file: &Path) -> Result<()> {
        info!("Restoring into database {}", database);
        self.execute(
            "pg_restore",
            Self::restore_args(connection, database, self.resolve(file)),
        )
        .map_err(|e| soften(e, ERRORS_IGNORED))?;
        Ok(())
    }

    fn required_tools(&self, tools: &[&str]) -> Vec<String> {
        match &self.location {
            DatabaseLocation::Local => tools.iter().map(|t| t.to_string()).collect(),
            DatabaseLocation::Container(_) => vec![self.docker_binary.clone()],
        }
    }
}

/// `/var/tmp/<file name>`
pub fn container_path(file: &Path) -> String {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("{}/{}", CONTAINER_DIR, name)
}

/// Double-quotes a PostgreSQL identifier
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Turns a tool failure whose output contains `marker` into `SoftConflict`
fn soften(error: Error, marker: &str) -> Error {
    match error {
        Error::ToolExecutionFailed { diagnostics, .. } if diagnostics.contains(marker) => {
            Error::SoftConflict(diagnostics)
        }
        other => other,
    }
}
