//! Restore workflow
//!
//! pull -> unpack -> create database -> copy to container -> import roles -> restore

use bocker_core::Result;
use bocker_image::unpack_backup;
use std::sync::Arc;
use tracing::info;

use super::{dedup, login_if_configured, tolerate_soft_conflict};
use crate::config::RestoreConfig;
use crate::context::RunContext;
use crate::docker::ContainerRuntime;
use crate::engine::{Pipeline, Stage};
use crate::postgres::{CONTAINER_DIR, DatabaseTools};
use crate::service::ActionLog;

pub const RESTORE_PIPELINE: &str = "restore";

/// Binaries the restore workflow needs on the host
///
/// `psql` covers both database creation and the roles import.
///
/// # Arguments
/// * `runtime_binary` - The container engine binary
/// * `database` - Where the PostgreSQL client tools run
///
/// # Returns
/// Deduplicated binary names, engine first
pub fn restore_tools(runtime_binary: &str, database: &dyn DatabaseTools) -> Vec<String> {
    let mut tools = vec![runtime_binary.to_string()];
    tools.extend(database.required_tools(&["psql", "pg_restore"]));
    dedup(tools)
}

/// Assembles the restore pipeline
///
/// # Arguments
/// * `context` - The run context owning the work directory
/// * `config` - The restore configuration naming source and target databases
/// * `runtime` - The container engine used to pull and save the image
/// * `database` - The PostgreSQL client tools used for the restore
///
/// # Returns
/// A pipeline named `restore`, ready to run
///
/// # Errors
/// `ConfigurationMissing` when `config` fails validation
pub fn restore_pipeline(
    context: &RunContext,
    config: RestoreConfig,
    runtime: Arc<dyn ContainerRuntime>,
    database: Arc<dyn DatabaseTools>,
) -> Result<Pipeline> {
    config.validate()?;

    let work_dir = context.work_dir().to_path_buf();
    let naming = config.naming();
    let dump_file = work_dir.join(naming.backup_file());
    let roles_file = work_dir.join(naming.roles_file());
    let image = config.image();
    let log: Arc<dyn ActionLog> = context.log();

    info!("Restoring {} from {} into {}", config.source, image, config.target);

    let pull = {
        let runtime = Arc::clone(&runtime);
        let credentials = config.credentials.clone();
        let image = image.clone();
        Stage::new("Pull backup image", move || {
            login_if_configured(runtime.as_ref(), credentials.as_ref(), &image)?;
            runtime.pull_image(&image)
        })
    };

    let unpack = {
        let runtime = Arc::clone(&runtime);
        let source = config.source.clone();
        let tag = config.tag.clone();
        let import_roles = config.import_roles;
        let work_dir = work_dir.clone();
        Stage::new("Extracting backup from image", move || {
            let extracted = unpack_backup(runtime.as_ref(), &image, &source, &tag, &work_dir)?;
            if import_roles {
                extracted.extract_roles(&naming, &work_dir)?;
            }
            Ok(())
        })
    };

    let create = {
        let database = Arc::clone(&database);
        let connection = config.connection.clone();
        let target = config.target.clone();
        let owner = config.owner().to_string();
        let log = Arc::clone(&log);
        Stage::new("Creating database", move || {
            tolerate_soft_conflict(
                database.create_database(&connection, &target, &owner),
                log.as_ref(),
            )
        })
    };

    let copy_to_container = {
        let runtime = Arc::clone(&runtime);
        let container = config.container.clone().unwrap_or_default();
        let in_container = config.container.is_some();
        let mut files = vec![dump_file.clone()];
        if config.import_roles {
            files.push(roles_file.clone());
        }
        Stage::new("Copy backup to container", move || {
            for file in &files {
                runtime.copy_to_container(&container, file, CONTAINER_DIR)?;
            }
            Ok(())
        })
        .skip_when(move || !in_container)
    };

    let import_roles = {
        let database = Arc::clone(&database);
        let connection = config.connection.clone();
        let enabled = config.import_roles;
        Stage::new("Importing roles", move || {
            database.import_roles(&connection, &roles_file)
        })
        .skip_when(move || !enabled)
    };

    let restore = {
        let connection = config.connection.clone();
        let target = config.target.clone();
        Stage::new("Restoring database", move || {
            tolerate_soft_conflict(
                database.restore(&connection, &target, &dump_file),
                log.as_ref(),
            )
        })
    };

    Ok(Pipeline::new(context.run_id(), RESTORE_PIPELINE)
        .stage(pull)
        .stage(unpack)
        .stage(create)
        .stage(copy_to_container)
        .stage(import_roles)
        .stage(restore))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CancelFlag;
    use crate::workflow::fakes::{FakeDatabase, FakeRuntime};
    use bocker_core::domain::credentials::RegistryCredentials;
    use bocker_core::domain::log::LogLevel;
    use bocker_core::domain::pipeline::{PipelineState, StageState};
    use bocker_core::{ArchiveError, Error};
    use tar::{Builder, Header};

    const TS: &str = "2024-01-01_00-00-00";

    fn tar_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = Builder::new(Vec::new());
        for (path, data) in entries {
            let mut header = Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    /// Saved image with a base layer and a payload layer holding dump and roles
    fn backup_image() -> Vec<u8> {
        let dump = format!("shop_{TS}_backup.psql");
        let roles = format!("shop_{TS}_roles_backup.sql");
        let payload = tar_bytes(&[
            (dump.as_str(), b"PGDMP restored bytes".as_slice()),
            (roles.as_str(), b"CREATE ROLE app;".as_slice()),
        ]);
        let base = tar_bytes(&[("etc/os-release", b"scratch".as_slice())]);
        let manifest: &[u8] = br#"[{"Config":"cfg.json","RepoTags":["bueti/shop-backups:2024-01-01_00-00-00"],"Layers":["base/layer.tar","payload/layer.tar"]}]"#;
        tar_bytes(&[
            ("manifest.json", manifest),
            ("base/layer.tar", base.as_slice()),
            ("payload/layer.tar", payload.as_slice()),
        ])
    }

    fn config() -> RestoreConfig {
        RestoreConfig::new("app", "shop", "shop_copy", "shop-backups", TS)
    }

    fn assemble(
        config: RestoreConfig,
    ) -> (RunContext, Pipeline, Arc<FakeRuntime>, Arc<FakeDatabase>) {
        let context = RunContext::new().unwrap();
        let runtime = Arc::new(FakeRuntime::default());
        *runtime.saved_archive.lock().unwrap() = backup_image();
        let database = Arc::new(FakeDatabase::default());
        let pipeline =
            restore_pipeline(&context, config, runtime.clone(), database.clone()).unwrap();
        (context, pipeline, runtime, database)
    }

    #[test]
    fn test_stage_order() {
        let (_context, pipeline, _, _) = assemble(config());
        let names: Vec<_> = pipeline.stages().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "Pull backup image",
                "Extracting backup from image",
                "Creating database",
                "Copy backup to container",
                "Importing roles",
                "Restoring database"
            ]
        );
    }

    #[test]
    fn test_local_restore_uses_extracted_dump() {
        let (context, mut pipeline, runtime, database) = assemble(config());

        pipeline.run(&CancelFlag::new()).unwrap();

        assert_eq!(
            runtime.recorder.calls(),
            vec![
                format!("pull bueti/shop-backups:{TS}"),
                format!("save bueti/shop-backups:{TS}"),
            ]
        );
        assert_eq!(
            database.recorder.calls(),
            vec![
                "create_database shop_copy app",
                "restore shop_copy PGDMP restored bytes"
            ]
        );
        assert!(context.work_dir().join(format!("shop_{TS}_backup.psql")).exists());
        assert!(!context.work_dir().join(format!("shop_{TS}_roles_backup.sql")).exists());
    }

    #[test]
    fn test_restore_with_roles_into_container() {
        let config = config()
            .with_import_roles(true)
            .with_container("pg-main")
            .with_namespace("registry.example.com/team")
            .with_credentials(RegistryCredentials::new("ci", "token"));
        let (_context, mut pipeline, runtime, database) = assemble(config);

        pipeline.run(&CancelFlag::new()).unwrap();

        assert_eq!(
            runtime.recorder.calls(),
            vec![
                "login ci registry.example.com".to_string(),
                format!("pull registry.example.com/team/shop-backups:{TS}"),
                format!("save registry.example.com/team/shop-backups:{TS}"),
                format!("copy_to pg-main:/var/tmp/shop_{TS}_backup.psql"),
                format!("copy_to pg-main:/var/tmp/shop_{TS}_roles_backup.sql"),
            ]
        );
        assert_eq!(
            database.recorder.calls(),
            vec![
                "create_database shop_copy app",
                "import_roles CREATE ROLE app;",
                "restore shop_copy PGDMP restored bytes"
            ]
        );
    }

    #[test]
    fn test_existing_database_is_a_soft_conflict() {
        let (context, mut pipeline, _, database) = assemble(config());
        database.recorder.fail(
            "create_database",
            Error::SoftConflict("database \"shop_copy\" already exists".to_string()),
        );

        pipeline.run(&CancelFlag::new()).unwrap();

        assert_eq!(pipeline.state(), PipelineState::Done);
        assert_eq!(pipeline.stages()[2].state(), StageState::Complete);
        assert_eq!(database.recorder.count("restore"), 1);
        assert!(
            context
                .log()
                .entries()
                .iter()
                .any(|e| e.level == LogLevel::Warning && e.message.contains("already exists"))
        );
    }

    #[test]
    fn test_ignored_restore_errors_still_complete() {
        let (_context, mut pipeline, _, database) = assemble(config());
        database.recorder.fail(
            "restore",
            Error::SoftConflict("errors ignored on restore: 2".to_string()),
        );

        assert!(pipeline.run(&CancelFlag::new()).is_ok());
    }

    #[test]
    fn test_hard_create_failure_halts() {
        let (_context, mut pipeline, _, database) = assemble(config());
        database.recorder.fail(
            "create_database",
            Error::tool_failed("psql", 2, "could not connect to server"),
        );

        let err = pipeline.run(&CancelFlag::new()).unwrap_err();

        assert!(matches!(err, Error::StageFailed { ref stage, .. } if stage == "Creating database"));
        assert_eq!(database.recorder.count("restore"), 0);
    }

    #[test]
    fn test_wrong_tag_fails_extraction() {
        let mut config = config();
        config.tag = "2023-12-31_23-59-59".to_string();
        let (_context, mut pipeline, _, database) = assemble(config);

        let err = pipeline.run(&CancelFlag::new()).unwrap_err();

        assert!(
            matches!(err, Error::StageFailed { ref stage, .. } if stage == "Extracting backup from image")
        );
        assert!(matches!(
            pipeline.failure().map(|(_, e)| e),
            Some(Error::Archive(ArchiveError::MemberNotFound { .. }))
        ));
        assert!(database.recorder.calls().is_empty());
    }

    #[test]
    fn test_required_tools() {
        let database = FakeDatabase::default();
        assert_eq!(
            restore_tools("docker", &database),
            vec!["docker", "psql", "pg_restore"]
        );
    }
}
