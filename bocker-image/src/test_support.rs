//! Helpers for building synthetic archives in tests

use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Builds an in-memory tar archive from `(path, contents)` pairs
pub fn tar_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, path, *data).unwrap();
    }
    builder.into_inner().unwrap()
}

/// Writes a tar archive with the given entries to `path`
pub fn write_tar(path: &Path, entries: &[(&str, &[u8])]) {
    let bytes = tar_bytes(entries);
    File::create(path).unwrap().write_all(&bytes).unwrap();
}

/// Gzip-compresses `bytes`
pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

/// A single-entry tar archive written byte by byte
///
/// The header name is copied verbatim (absolute paths included) and the size
/// field may disagree with the data that follows.
pub fn raw_tar_entry(name: &str, declared_size: u64, data: &[u8]) -> Vec<u8> {
    let mut header = tar::Header::new_gnu();
    header.as_old_mut().name[..name.len()].copy_from_slice(name.as_bytes());
    header.set_size(declared_size);
    header.set_mode(0o644);
    header.set_entry_type(tar::EntryType::Regular);
    header.set_cksum();

    let mut bytes = header.as_bytes().to_vec();
    bytes.extend_from_slice(data);
    bytes.resize(bytes.len().next_multiple_of(512), 0);
    bytes.extend_from_slice(&[0u8; 1024]);
    bytes
}
