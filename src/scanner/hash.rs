use std::{fs, io::Read, path::Path};

use sha2::{Digest, Sha256};

use crate::cancel::CancelToken;

/// Default read size for streaming a file into the hasher.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Lower-case hex SHA-256 of an in-memory buffer.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Stream `path` through SHA-256 in `chunk_size` reads.
///
/// Returns `Ok(None)` when `cancel` fires between chunks; the partial digest
/// is discarded.
pub fn hash_file(
    path: &Path,
    chunk_size: usize,
    cancel: &CancelToken,
) -> std::io::Result<Option<String>> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];
    loop {
        if cancel.is_canceled() {
            return Ok(None);
        }
        let read = match file.read(&mut buffer) {
            Ok(read) => read,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(Some(format!("{:x}", hasher.finalize())))
}
