//! Container runtime management
//!
//! Handles everything the workflows ask of the container engine:
//! - Registry login before push/pull
//! - Building, pushing, pulling and saving backup images
//! - Moving files in and out of a database container
//!
//! The engine binary is configurable so `podman` can stand in for `docker`.

use bocker_core::domain::credentials::RegistryCredentials;
use bocker_core::domain::image::ImageReference;
use bocker_core::{Error, Result};
use bocker_image::{BuildArguments, ImageSaver};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::process::ToolRunner;

/// Default container engine binary
pub const DEFAULT_BINARY: &str = "docker";

/// Operations the workflows need from a container engine
pub trait ContainerRuntime: ImageSaver {
    /// Authenticates against a registry
    ///
    /// # Arguments
    /// * `credentials` - Username and password, the password is sent on stdin
    /// * `registry` - The registry host (Docker Hub when `None`)
    ///
    /// # Errors
    /// `ConfigurationMissing` when the credentials are incomplete, `ToolExecutionFailed` when the engine rejects them
    fn login(&self, credentials: &RegistryCredentials, registry: Option<&str>) -> Result<()>;

    /// Builds `image` from the build context
    ///
    /// # Arguments
    /// * `build` - Recipe path, context directory and build args
    /// * `image` - The tag given to the result
    fn build_image(&self, build: &BuildArguments, image: &ImageReference) -> Result<()>;

    /// Pushes `image` to its registry
    fn push_image(&self, image: &ImageReference) -> Result<()>;

    /// Pulls `image` from its registry
    fn pull_image(&self, image: &ImageReference) -> Result<()>;

    /// Copies a file out of a container
    ///
    /// # Arguments
    /// * `container` - The container name or ID
    /// * `source` - The path inside the container
    /// * `destination` - The host directory receiving the file
    fn copy_from_container(&self, container: &str, source: &str, destination: &Path) -> Result<()>;

    /// Copies a host file into a container
    ///
    /// # Arguments
    /// * `container` - The container name or ID
    /// * `source` - The host file
    /// * `destination` - The path inside the container
    fn copy_to_container(&self, container: &str, source: &Path, destination: &str) -> Result<()>;
}

/// Container runtime backed by the `docker` (or compatible) CLI
#[derive(Clone)]
pub struct DockerCli {
    binary: String,
    runner: ToolRunner,
}

impl DockerCli {
    /// Create a runtime using the `docker` binary
    ///
    /// # Arguments
    /// * `runner` - Runs the engine commands and records them
    pub fn new(runner: ToolRunner) -> Self {
        Self::with_binary(DEFAULT_BINARY, runner)
    }

    /// Create a runtime using a compatible engine such as `podman`
    ///
    /// # Arguments
    /// * `binary` - The engine binary name or path
    /// * `runner` - Runs the engine commands and records them
    pub fn with_binary(binary: impl Into<String>, runner: ToolRunner) -> Self {
        Self {
            binary: binary.into(),
            runner,
        }
    }

    /// # Returns
    /// The engine binary this runtime invokes
    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn login_args(credentials: &RegistryCredentials, registry: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "login".to_string(),
            "--username".to_string(),
            credentials.username.clone(),
            "--password-stdin".to_string(),
        ];
        if let Some(registry) = registry {
            args.push(registry.to_string());
        }
        args
    }

    fn build_args(build: &BuildArguments, image: &ImageReference) -> Vec<String> {
        let mut args = vec![
            "build".to_string(),
            "-f".to_string(),
            build.recipe.display().to_string(),
            "-t".to_string(),
            image.to_string(),
        ];
        for (key, value) in &build.args {
            args.push("--build-arg".to_string());
            args.push(format!("{}={}", key, value));
        }
        args.push(build.context_dir.display().to_string());
        args
    }

    fn save_args(image: &ImageReference, destination: &Path) -> Vec<String> {
        vec![
            "save".to_string(),
            "-o".to_string(),
            destination.display().to_string(),
            image.to_string(),
        ]
    }

    fn copy_args(source: String, destination: String) -> Vec<String> {
        vec!["cp".to_string(), source, destination]
    }
}

impl ImageSaver for DockerCli {
    /// Writes to a `.partial` sibling first and renames on success
    fn save_image(&self, image: &ImageReference, destination: &Path) -> Result<()> {
        let partial = partial_path(destination);
        debug!("Saving {} to {}", image, partial.display());

        if let Err(e) = self.runner.run(&self.binary, &Self::save_args(image, &partial)) {
            let _ = std::fs::remove_file(&partial);
            return Err(e);
        }

        std::fs::rename(&partial, destination)?;
        Ok(())
    }
}

impl ContainerRuntime for DockerCli {
    fn login(&self, credentials: &RegistryCredentials, registry: Option<&str>) -> Result<()> {
        if !credentials.is_complete() {
            return Err(Error::missing("registry username and password"));
        }

        info!(
            "Logging in to {} as {}",
            registry.unwrap_or("Docker Hub"),
            credentials.username
        );
        self.runner.run_with_stdin(
            &self.binary,
            &Self::login_args(credentials, registry),
            &credentials.password,
        )?;
        Ok(())
    }

    fn build_image(&self, build: &BuildArguments, image: &ImageReference) -> Result<()> {
        info!("Building image {}", image);
        self.runner.run(&self.binary, &Self::build_args(build, image))?;
        Ok(())
    }

    fn push_image(&self, image: &ImageReference) -> Result<()> {
        info!("Pushing image {}", image);
        self.runner
            .run(&self.binary, &["push".to_string(), image.to_string()])?;
        Ok(())
    }

    fn pull_image(&self, image: &ImageReference) -> Result<()> {
        info!("Pulling image {}", image);
        self.runner
            .run(&self.binary, &["pull".to_string(), image.to_string()])?;
        Ok(())
    }

    fn copy_from_container(&self, container: &str, source: &str, destination: &Path) -> Result<()> {
        debug!("Copying {}:{} to {}", container, source, destination.display());
        self.runner.run(
            &self.binary,
            &Self::copy_args(
                format!("{}:{}", container, source),
                destination.display().to_string(),
            ),
        )?;
        Ok(())
    }

    fn copy_to_container(&self, container: &str, source: &Path, destination: &str) -> Result<()> {
        debug!("Copying {} to {}:{}", source.display(), container, destination);
        self.runner.run(
            &self.binary,
            &Self::copy_args(
                source.display().to_string(),
                format!("{}:{}", container, destination),
            ),
        )?;
        Ok(())
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push(".partial");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{ActionLog, InMemoryActionLog};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn image() -> ImageReference {
        ImageReference::new("bueti", "shop-backups", "2024-01-01_00-00-00")
    }

    #[test]
    fn test_login_reads_password_from_stdin() {
        let creds = RegistryCredentials::new("bueti", "dckr_pat_secret");
        let args = DockerCli::login_args(&creds, None);
        assert_eq!(args, vec!["login", "--username", "bueti", "--password-stdin"]);
        assert!(!args.iter().any(|a| a.contains("secret")));

        let args = DockerCli::login_args(&creds, Some("registry.example.com:5000"));
        assert_eq!(args.last().map(String::as_str), Some("registry.example.com:5000"));
    }

    #[test]
    fn test_build_passes_every_build_arg() {
        let mut build_args = BTreeMap::new();
        build_args.insert("backup_file".to_string(), "shop_ts_backup.psql".to_string());
        build_args.insert("roles_file".to_string(), "shop_ts_roles_backup.sql".to_string());
        let build = BuildArguments {
            args: build_args,
            recipe: PathBuf::from("/work/Dockerfile"),
            context_dir: PathBuf::from("/work"),
        };

        let args = DockerCli::build_args(&build, &image());

        assert_eq!(
            args,
            vec![
                "build",
                "-f",
                "/work/Dockerfile",
                "-t",
                "bueti/shop-backups:2024-01-01_00-00-00",
                "--build-arg",
                "backup_file=shop_ts_backup.psql",
                "--build-arg",
                "roles_file=shop_ts_roles_backup.sql",
                "/work",
            ]
        );
    }

    #[test]
    fn test_save_targets_partial_file() {
        let partial = partial_path(Path::new("/work/output.tar"));
        assert_eq!(partial, PathBuf::from("/work/output.tar.partial"));

        let args = DockerCli::save_args(&image(), &partial);
        assert_eq!(args[0], "save");
        assert_eq!(args[2], "/work/output.tar.partial");
    }

    #[test]
    fn test_failed_save_leaves_no_archive() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(InMemoryActionLog::new());
        let docker = DockerCli::with_binary("bocker-test-no-such-engine", ToolRunner::new(log.clone()));
        let destination = dir.path().join("output.tar");

        let err = docker.save_image(&image(), &destination).unwrap_err();

        assert!(matches!(err, Error::ToolNotFound { .. }));
        assert!(!destination.exists());
        assert!(!partial_path(&destination).exists());
        assert_eq!(log.entries().len(), 1);
    }

    #[test]
    fn test_login_requires_complete_credentials() {
        let docker = DockerCli::new(ToolRunner::new(Arc::new(InMemoryActionLog::new())));
        let err = docker
            .login(&RegistryCredentials::new("bueti", ""), None)
            .unwrap_err();
        assert!(matches!(err, Error::ConfigurationMissing(_)));
    }
}
