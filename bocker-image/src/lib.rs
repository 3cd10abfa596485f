//! Bocker Image Codec
//!
//! Reads and writes the container images that carry database backups.
//!
//! This crate provides:
//! - Archive extraction: pull a single named member out of a tar archive
//! - The write path: stage a dump (and roles) file as image build arguments
//! - The read path: find the dump inside a saved image's last layer
//!
//! Everything here is synchronous and works directly on files; the container
//! runtime is reached through the [`ImageSaver`] trait.

pub mod archive;
pub mod codec;

#[cfg(test)]
pub(crate) mod test_support;

pub use archive::{extract, read_member};
pub use codec::{
    BuildArguments, ExtractedBackup, ImageSaver, MANIFEST_FILE, OUTPUT_ARCHIVE, RECIPE_FILE,
    package_build_context, unpack_backup,
};
