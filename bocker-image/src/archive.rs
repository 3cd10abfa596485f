//! Archive extraction
//!
//! Selective extraction of a single member from a tar archive. Saved images
//! carry many unrelated layers, so only the requested member is ever written;
//! unpacking everything would be wasteful and layer file names can collide.
//!
//! Archives may be plain or gzip-compressed; compression is detected from the
//! leading magic bytes, so compressed layer blobs read like plain ones.

use bocker_core::{ArchiveError, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Extracts `member` from the tar archive at `archive` into `destination`
///
/// `member` is matched exactly against each entry's header path; there is no
/// globbing and no normalisation of `./` prefixes. The member keeps its
/// relative path below `destination` (parent directories are created); a
/// leading `/` is dropped, so the file never lands outside `destination`.
///
/// # Arguments
/// * `archive` - Plain or gzip-compressed tar archive
/// * `member` - Exact header path of the entry to extract
/// * `destination` - Directory the entry is written below
///
/// # Returns
/// Absolute path of the extracted member, always inside `destination`
///
/// # Errors
/// - `ArchiveNotFound` if `archive` does not exist
/// - `MemberNotFound` if no entry matches `member`
/// - `ExtractionFailed` for I/O or format errors, or a member path that would
///   escape `destination`
pub fn extract(archive: &Path, member: &str, destination: &Path) -> Result<PathBuf> {
    let failed = |diagnostics: String| ArchiveError::ExtractionFailed {
        archive: archive.to_path_buf(),
        member: member.to_string(),
        diagnostics,
    };

    std::fs::create_dir_all(destination).map_err(|e| failed(e.to_string()))?;

    let mut tar = tar::Archive::new(open_archive(archive, member)?);
    tar.set_preserve_mtime(false);

    let entries = tar.entries().map_err(|e| failed(e.to_string()))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| failed(e.to_string()))?;
        if entry.path_bytes().as_ref() != member.as_bytes() {
            continue;
        }

        debug!(
            "Extracting '{}' ({} bytes) from {}",
            member,
            entry.size(),
            archive.display()
        );

        let unpacked = entry
            .unpack_in(destination)
            .map_err(|e| failed(e.to_string()))?;
        if !unpacked {
            return Err(failed("member path escapes the destination directory".to_string()).into());
        }

        let target = unpacked_path(destination, member);
        return std::path::absolute(&target).map_err(|e| failed(e.to_string()).into());
    }

    Err(ArchiveError::MemberNotFound {
        archive: archive.to_path_buf(),
        member: member.to_string(),
    }
    .into())
}

/// Reads `member` from the tar archive at `archive` into memory
///
/// Same matching and error rules as [`extract`], without touching disk. The
/// buffer grows with the bytes actually read, never with the size the header
/// claims.
pub fn read_member(archive: &Path, member: &str) -> Result<Vec<u8>> {
    let failed = |diagnostics: String| ArchiveError::ExtractionFailed {
        archive: archive.to_path_buf(),
        member: member.to_string(),
        diagnostics,
    };

    let mut tar = tar::Archive::new(open_archive(archive, member)?);
    let entries = tar.entries().map_err(|e| failed(e.to_string()))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| failed(e.to_string()))?;
        if entry.path_bytes().as_ref() != member.as_bytes() {
            continue;
        }

        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .map_err(|e| failed(e.to_string()))?;
        return Ok(contents);
    }

    Err(ArchiveError::MemberNotFound {
        archive: archive.to_path_buf(),
        member: member.to_string(),
    }
    .into())
}

/// Where `unpack_in` writes `member`: only its normal components, joined
/// below `destination`
fn unpacked_path(destination: &Path, member: &str) -> PathBuf {
    let mut target = destination.to_path_buf();
    for component in Path::new(member).components() {
        if let Component::Normal(part) = component {
            target.push(part);
        }
    }
    target
}

/// Opens `archive`, unwrapping gzip when the magic bytes say so
fn open_archive(archive: &Path, member: &str) -> Result<Box<dyn Read>> {
    let failed = |e: std::io::Error| ArchiveError::ExtractionFailed {
        archive: archive.to_path_buf(),
        member: member.to_string(),
        diagnostics: e.to_string(),
    };

    let file = File::open(archive).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ArchiveError::ArchiveNotFound(archive.to_path_buf())
        } else {
            failed(e)
        }
    })?;

    let mut reader = BufReader::new(file);
    let compressed = reader.fill_buf().map_err(failed)?.starts_with(&GZIP_MAGIC);
    if compressed {
        debug!("{} is gzip-compressed", archive.display());
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{gzip, raw_tar_entry, tar_bytes, write_tar};
    use bocker_core::Error;

    #[test]
    fn test_extracts_only_the_requested_member() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bundle.tar");
        write_tar(
            &archive,
            &[("one.txt", b"first"), ("two.txt", b"second"), ("three.txt", b"third")],
        );

        let out = dir.path().join("out");
        let path = extract(&archive, "two.txt", &out).unwrap();

        assert!(path.is_absolute());
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert!(!out.join("one.txt").exists());
        assert!(!out.join("three.txt").exists());
    }

    #[test]
    fn test_preserves_nested_member_path() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("image.tar");
        write_tar(&archive, &[("blobs/sha256/abc123", b"layer bytes")]);

        let path = extract(&archive, "blobs/sha256/abc123", dir.path()).unwrap();

        assert_eq!(path, std::path::absolute(dir.path().join("blobs/sha256/abc123")).unwrap());
        assert_eq!(std::fs::read(path).unwrap(), b"layer bytes");
    }

    #[test]
    fn test_missing_archive() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract(&dir.path().join("nope.tar"), "x", dir.path()).unwrap_err();
        assert!(matches!(err, Error::Archive(ArchiveError::ArchiveNotFound(_))));
    }

    #[test]
    fn test_missing_member() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bundle.tar");
        write_tar(&archive, &[("present.txt", b"x")]);

        let err = extract(&archive, "absent.txt", dir.path()).unwrap_err();
        match err {
            Error::Archive(ArchiveError::MemberNotFound { member, .. }) => {
                assert_eq!(member, "absent.txt")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_member_match_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bundle.tar");
        write_tar(&archive, &[("var/tmp/dump.psql", b"x")]);

        assert!(extract(&archive, "dump.psql", dir.path()).is_err());
        assert!(extract(&archive, "tmp/dump.psql", dir.path()).is_err());
        assert!(extract(&archive, "var/tmp/dump.psql", dir.path()).is_ok());
    }

    #[test]
    fn test_corrupt_archive_reports_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bad.tar");
        std::fs::write(&archive, vec![0xffu8; 1024]).unwrap();

        let err = extract(&archive, "anything", dir.path()).unwrap_err();
        assert!(matches!(
            err,
            Error::Archive(ArchiveError::ExtractionFailed { .. })
                | Error::Archive(ArchiveError::MemberNotFound { .. })
        ));
    }

    #[test]
    fn test_read_member() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bundle.tar");
        write_tar(&archive, &[("manifest.json", b"[]"), ("other", b"y")]);

        assert_eq!(read_member(&archive, "manifest.json").unwrap(), b"[]");
        assert!(read_member(&archive, "missing.json").is_err());
    }

    #[test]
    fn test_oversized_header_does_not_preallocate() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("lying.tar");
        std::fs::write(&archive, raw_tar_entry("manifest.json", 1 << 36, b"[]")).unwrap();

        match read_member(&archive, "manifest.json") {
            Ok(contents) => assert!(contents.starts_with(b"[]") && contents.len() < 4096),
            Err(err) => assert!(matches!(
                err,
                Error::Archive(ArchiveError::ExtractionFailed { .. })
            )),
        }
    }

    #[test]
    fn test_absolute_member_stays_inside_destination() {
        let dir = tempfile::tempdir().unwrap();
        let host_file = dir.path().join("host_layer.tar");
        std::fs::write(&host_file, b"HOST FILE").unwrap();

        let member = "/bocker-absolute/layer.tar";
        let archive = dir.path().join("image.tar");
        std::fs::write(&archive, raw_tar_entry(member, 7, b"ARCHIVE")).unwrap();
        let destination = dir.path().join("dest");

        let path = extract(&archive, member, &destination).unwrap();

        assert!(path.starts_with(std::path::absolute(&destination).unwrap()));
        assert!(path.ends_with("bocker-absolute/layer.tar"));
        assert_eq!(std::fs::read(&path).unwrap(), b"ARCHIVE");
        assert_eq!(std::fs::read(&host_file).unwrap(), b"HOST FILE");
    }

    #[test]
    fn test_unpacked_path_keeps_normal_components() {
        let destination = Path::new("/work");
        assert_eq!(
            unpacked_path(destination, "/abs/layer.tar"),
            PathBuf::from("/work/abs/layer.tar")
        );
        assert_eq!(
            unpacked_path(destination, "./blobs/sha256/ab"),
            PathBuf::from("/work/blobs/sha256/ab")
        );
    }

    #[test]
    fn test_gzip_archive_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("layer.tar.gz");
        std::fs::write(&archive, gzip(&tar_bytes(&[("dump.psql", b"PGDMP")]))).unwrap();

        assert_eq!(read_member(&archive, "dump.psql").unwrap(), b"PGDMP");
        let path = extract(&archive, "dump.psql", &dir.path().join("out")).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"PGDMP");
    }
}
