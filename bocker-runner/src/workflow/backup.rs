//! Backup workflow
//!
//! dump -> export roles -> copy from container -> build image -> push image

use bocker_core::Result;
use bocker_image::package_build_context;
use std::sync::Arc;
use tracing::info;

use super::{dedup, login_if_configured};
use crate::config::BackupConfig;
use crate::context::RunContext;
use crate::docker::ContainerRuntime;
use crate::engine::{Pipeline, Stage};
use crate::postgres::{DatabaseTools, container_path};

pub const BACKUP_PIPELINE: &str = "backup";

/// Binaries the backup workflow needs on the host
///
/// # Arguments
/// * `config` - The backup configuration; `export_roles` adds `pg_dumpall`
/// * `runtime_binary` - The container engine binary
/// * `database` - Where the PostgreSQL client tools run
///
/// # Returns
/// Deduplicated binary names, engine first
pub fn backup_tools(
    config: &BackupConfig,
    runtime_binary: &str,
    database: &dyn DatabaseTools,
) -> Vec<String> {
    let mut needed = vec!["pg_dump"];
    if config.export_roles {
        needed.push("pg_dumpall");
    }

    let mut tools = vec![runtime_binary.to_string()];
    tools.extend(database.required_tools(&needed));
    dedup(tools)
}

/// Assembles the backup pipeline
///
/// # Arguments
/// * `context` - The run context owning the work directory
/// * `config` - The validated backup configuration
/// * `runtime` - The container engine used to build and push the image
/// * `database` - The PostgreSQL client tools used for the dump
///
/// # Returns
/// A pipeline named `backup`, ready to run
///
/// # Errors
/// `ConfigurationMissing` when `config` fails validation
pub fn backup_pipeline(
    context: &RunContext,
    config: BackupConfig,
    runtime: Arc<dyn ContainerRuntime>,
    database: Arc<dyn DatabaseTools>,
) -> Result<Pipeline> {
    config.validate()?;

    let work_dir = context.work_dir().to_path_buf();
    let dump_file = work_dir.join(config.naming.backup_file());
    let roles_file = work_dir.join(config.naming.roles_file());
    let image = config.image();

    info!("Backing up {} as {}", config.source, image);

    let dump = {
        let database = Arc::clone(&database);
        let connection = config.connection.clone();
        let source = config.source.clone();
        let dump_file = dump_file.clone();
        Stage::new("Creating backup", move || {
            database.dump(&connection, &source, &dump_file)
        })
    };

    let export_roles = {
        let database = Arc::clone(&database);
        let connection = config.connection.clone();
        let roles_file = roles_file.clone();
        let enabled = config.export_roles;
        Stage::new("Exporting roles", move || {
            database.export_roles(&connection, &roles_file)
        })
        .skip_when(move || !enabled)
    };

    let copy_from_container = {
        let runtime = Arc::clone(&runtime);
        let container = config.container.clone().unwrap_or_default();
        let in_container = config.container.is_some();
        let mut files = vec![container_path(&dump_file)];
        if config.export_roles {
            files.push(container_path(&roles_file));
        }
        let work_dir = work_dir.clone();
        Stage::new("Copy from container", move || {
            for file in &files {
                runtime.copy_from_container(&container, file, &work_dir)?;
            }
            Ok(())
        })
        .skip_when(move || !in_container)
    };

    let build = {
        let runtime = Arc::clone(&runtime);
        let image = image.clone();
        let dump_file = dump_file.clone();
        let roles_file = config.export_roles.then(|| roles_file.clone());
        Stage::new("Building image", move || {
            let build = package_build_context(&dump_file, roles_file.as_deref())?;
            runtime.build_image(&build, &image)
        })
    };

    let push = {
        let runtime = Arc::clone(&runtime);
        let credentials = config.credentials.clone();
        Stage::new("Pushing image", move || {
            login_if_configured(runtime.as_ref(), credentials.as_ref(), &image)?;
            runtime.push_image(&image)
        })
    };

    Ok(Pipeline::new(context.run_id(), BACKUP_PIPELINE)
        .stage(dump)
        .stage(export_roles)
        .stage(copy_from_container)
        .stage(build)
        .stage(push))
}
