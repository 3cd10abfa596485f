//! Backup-image codec
//!
//! Write path: stage the dump (and optional roles) file as build arguments and
//! generate the build recipe. Read path: save the image to `output.tar`, read
//! its `manifest.json`, take the last layer of the first entry and extract the
//! dump from inside that nested layer archive.
//!
//! The two sides share one contract: the recipe is `FROM scratch` followed by
//! a single `COPY` that adds every payload file, and that `COPY` is the final
//! instruction. The payload therefore always lands in the last layer. Adding
//! an instruction after the `COPY` silently breaks the read path.

use bocker_core::domain::backup::BackupNaming;
use bocker_core::domain::image::{ImageReference, ManifestEntry};
use bocker_core::{ArchiveError, Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::archive;

/// File name of the generated build recipe inside the build context
pub const RECIPE_FILE: &str = "Dockerfile";

/// File name the saved image is written to inside the working directory
pub const OUTPUT_ARCHIVE: &str = "output.tar";

/// Member of a saved image listing its layers
pub const MANIFEST_FILE: &str = "manifest.json";

/// Build argument naming the dump file
pub const BACKUP_FILE_ARG: &str = "backup_file";

/// Build argument naming the roles file
pub const ROLES_FILE_ARG: &str = "roles_file";

/// Materialises an image as a single flat archive file
///
/// Implemented by the container runtime. Must be atomic from the caller's
/// point of view: either `destination` holds the whole archive or an error
/// is returned.
pub trait ImageSaver: Send + Sync {
    fn save_image(&self, image: &ImageReference, destination: &Path) -> Result<()>;
}

/// Everything an image build needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArguments {
    /// Named build arguments (`backup_file`, optionally `roles_file`)
    pub args: BTreeMap<String, String>,
    /// Path of the generated recipe
    pub recipe: PathBuf,
    /// Build context directory holding the payload files
    pub context_dir: PathBuf,
}

/// Generates the build recipe
///
/// The payload `COPY` must stay the last instruction; see the module docs.
pub fn recipe(with_roles: bool) -> String {
    let mut recipe = String::from("FROM scratch\n");
    recipe.push_str(&format!("ARG {}\n", BACKUP_FILE_ARG));
    if with_roles {
        recipe.push_str(&format!("ARG {}\n", ROLES_FILE_ARG));
        recipe.push_str(&format!(
            "COPY ${{{}}} ${{{}}} /\n",
            BACKUP_FILE_ARG, ROLES_FILE_ARG
        ));
    } else {
        recipe.push_str(&format!("COPY ${{{}}} /\n", BACKUP_FILE_ARG));
    }
    recipe
}

/// Stages a dump file (and optional roles file) for an image build
///
/// The dump file's directory becomes the build context; the roles file must
/// live in the same directory. Writes the recipe into the context.
pub fn package_build_context(dump_file: &Path, roles_file: Option<&Path>) -> Result<BuildArguments> {
    std::fs::metadata(dump_file)?;
    let context_dir = dump_file
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::missing("build context directory for the dump file"))?;

    let mut args = BTreeMap::new();
    args.insert(BACKUP_FILE_ARG.to_string(), file_name(dump_file)?);

    if let Some(roles_file) = roles_file {
        std::fs::metadata(roles_file)?;
        if roles_file.parent() != Some(context_dir.as_path()) {
            return Err(Error::missing(format!(
                "roles file {} inside build context {}",
                roles_file.display(),
                context_dir.display()
            )));
        }
        args.insert(ROLES_FILE_ARG.to_string(), file_name(roles_file)?);
    }

    let recipe_path = context_dir.join(RECIPE_FILE);
    std::fs::write(&recipe_path, recipe(roles_file.is_some()))?;
    debug!("Wrote build recipe to {}", recipe_path.display());

    Ok(BuildArguments {
        args,
        recipe: recipe_path,
        context_dir,
    })
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::missing(format!("file name of {}", path.display())))
}

/// Files recovered from a backup image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedBackup {
    /// Absolute path of the extracted dump file
    pub dump: PathBuf,
    /// Path of the extracted payload layer archive
    pub layer: PathBuf,
}

impl ExtractedBackup {
    /// Extracts the roles file from the payload layer
    ///
    /// The roles file shares the dump's layer because the recipe copies both
    /// in one instruction.
    pub fn extract_roles(&self, naming: &BackupNaming, work_dir: &Path) -> Result<PathBuf> {
        archive::extract(&self.layer, &naming.roles_file(), work_dir)
    }
}

/// Picks the payload layer from a saved image's manifest
///
/// Only the first entry is consulted, and only its last layer.
pub fn select_backup_layer(manifest: &[u8]) -> Result<String> {
    let entries: Vec<ManifestEntry> = serde_json::from_slice(manifest)
        .map_err(|e| ArchiveError::ManifestInvalid(e.to_string()))?;

    let first = entries.first().ok_or(ArchiveError::ManifestEmpty)?;
    let layer = first.last_layer().ok_or(ArchiveError::NoLayers)?;
    Ok(layer.to_string())
}

/// Recovers the dump file from a backup image
///
/// 1. Saves `image` to `work_dir/output.tar` through `saver`
/// 2. Reads `manifest.json` and selects the last layer of the first entry
/// 3. Extracts that layer archive into `work_dir`, keeping its path
/// 4. Extracts `{source}_{tag}_backup.psql` from the layer into `work_dir`
///
/// Layer blobs may be plain or gzip-compressed tar.
///
/// Any failure aborts the unpack; there is no retry since the same image
/// would fail the same way.
pub fn unpack_backup<S: ImageSaver + ?Sized>(
    saver: &S,
    image: &ImageReference,
    source: &str,
    tag: &str,
    work_dir: &Path,
) -> Result<ExtractedBackup> {
    let output = work_dir.join(OUTPUT_ARCHIVE);
    info!("Saving image {} to {}", image, output.display());
    saver.save_image(image, &output)?;

    let manifest = archive::read_member(&output, MANIFEST_FILE).map_err(|e| match e {
        Error::Archive(ArchiveError::MemberNotFound { archive, .. }) => {
            ArchiveError::ManifestMissing(archive).into()
        }
        other => other,
    })?;

    let layer_member = select_backup_layer(&manifest)?;
    debug!("Backup layer is '{}'", layer_member);

    let layer = archive::extract(&output, &layer_member, work_dir)?;

    let naming = BackupNaming::new(source, tag);
    let dump = archive::extract(&layer, &naming.backup_file(), work_dir)?;
    info!("Extracted backup to {}", dump.display());

    Ok(ExtractedBackup { dump, layer })
}
