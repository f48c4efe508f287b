use std::path::{Path, PathBuf};

use crate::store::atomic_write;

pub(super) const BLOB_DIR: &str = "blobs";

/// Blob location for `relative_path` holding content `content_hash`.
///
/// The two fan-out levels come from the BLAKE3 digest of the path so one
/// directory never collects every blob.
pub(super) fn blob_location(relative_path: &str, content_hash: &str) -> String {
    let digest = blake3::hash(relative_path.as_bytes()).to_hex();
    let digest = digest.as_str();
    format!(
        "{BLOB_DIR}/{}/{}/{content_hash}.blob",
        &digest[0..2],
        &digest[2..4]
    )
}

pub(super) fn blob_path(cache_dir: &Path, location: &str) -> PathBuf {
    location
        .split('/')
        .fold(cache_dir.to_path_buf(), |path, segment| path.join(segment))
}

pub(super) fn write_blob(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    atomic_write(path, bytes)
}

pub(super) fn remove_blob(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}
