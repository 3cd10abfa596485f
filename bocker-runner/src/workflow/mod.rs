//! Backup and restore workflows
//!
//! Each workflow validates its configuration and assembles a [`Pipeline`]
//! whose stage closures own clones of exactly the collaborators and config
//! fields they use. Files live at deterministic paths inside the run's
//! working directory, so stages hand results to each other through the
//! filesystem instead of shared state.
//!
//! [`Pipeline`]: crate::engine::Pipeline

mod backup;
mod restore;

pub use backup::{BACKUP_PIPELINE, backup_pipeline, backup_tools};
pub use restore::{RESTORE_PIPELINE, restore_pipeline, restore_tools};

use bocker_core::Result;
use bocker_core::domain::credentials::RegistryCredentials;
use bocker_core::domain::image::ImageReference;
use tracing::warn;

use crate::docker::ContainerRuntime;
use crate::service::ActionLog;

/// Logs in before a push or pull when credentials were supplied
fn login_if_configured(
    runtime: &dyn ContainerRuntime,
    credentials: Option<&RegistryCredentials>,
    image: &ImageReference,
) -> Result<()> {
    match credentials {
        Some(credentials) => runtime.login(credentials, image.registry()),
        None => Ok(()),
    }
}

/// Downgrades `SoftConflict` to a warning
fn tolerate_soft_conflict(result: Result<()>, log: &dyn ActionLog) -> Result<()> {
    match result {
        Err(e) if e.is_soft_conflict() => {
            warn!("{}", e);
            log.warning(e.to_string());
            Ok(())
        }
        other => other,
    }
}

fn dedup(mut tools: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tools.retain(|t| seen.insert(t.clone()));
    tools
}
