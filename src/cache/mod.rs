//! Content-addressed copies of previously packaged files.
//!
//! The cache keeps the last known bytes of each relative path so earlier
//! versions of a file can be shown without reopening old archives. Blobs live
//! on disk under `blobs/`; the index is persisted through a [`RecordStore`].

mod blob;
mod index;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::filter::normalize_relative;
use crate::scanner::hash_bytes;
use crate::store::{JsonFileStore, RecordStore, StoreError, load_json, save_json, utc_timestamp};

pub use index::CacheEntry;

use blob::{BLOB_DIR, blob_location, blob_path, remove_blob, write_blob};
use index::CacheIndex;

/// Record key of the cache index.
pub const INDEX_KEY: &str = "cache_index.json";

const BINARY_SNIFF_LEN: usize = 8 * 1024;

/// Errors raised by [`ContentCache`] operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to read source file {path}: {source}")]
    ReadSource {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write cache blob {path}: {source}")]
    WriteBlob {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to clear cache blobs at {path}: {source}")]
    Clear {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid cache path: '{0}'")]
    InvalidPath(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Summary of the cache contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheInfo {
    pub total_files: usize,
    pub total_size: u64,
    pub last_update: Option<String>,
    pub cache_dir: PathBuf,
}

/// Per-path store of last known file content.
pub struct ContentCache<S: RecordStore = JsonFileStore> {
    dir: PathBuf,
    store: S,
    index: CacheIndex,
}

impl ContentCache<JsonFileStore> {
    /// Open the cache rooted at `dir`, keeping the index next to the blobs.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        let store = JsonFileStore::open(&dir)?;
        Ok(Self::with_store(dir, store))
    }
}

impl<S: RecordStore> ContentCache<S> {
    /// Use `dir` for blobs and `store` for the index.
    ///
    /// An unreadable or malformed index is replaced by an empty one.
    pub fn with_store(dir: impl Into<PathBuf>, store: S) -> Self {
        let dir = dir.into();
        let index = match load_json::<CacheIndex, _>(&store, INDEX_KEY) {
            Ok(Some(index)) => index,
            Ok(None) => CacheIndex::default(),
            Err(err) => {
                warn!(
                    dir = %dir.display(),
                    error = %err,
                    "Cache index unusable, starting empty"
                );
                CacheIndex::default()
            }
        };
        debug!(dir = %dir.display(), files = index.files.len(), "Opened content cache");
        Self { dir, store, index }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.index.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.files.is_empty()
    }

    /// Store `bytes` as the current content of `relative_path`.
    ///
    /// Returns `false` without touching disk when the cached hash already
    /// matches.
    pub fn put(&mut self, relative_path: &str, bytes: &[u8]) -> Result<bool, CacheError> {
        let key = normalize_relative(relative_path);
        if key.is_empty() {
            return Err(CacheError::InvalidPath(relative_path.to_string()));
        }
        let content_hash = hash_bytes(bytes);
        if let Some(existing) = self.index.files.get(&key) {
            if existing.content_hash == content_hash
                && blob_path(&self.dir, &existing.blob).is_file()
            {
                return Ok(false);
            }
        }

        let location = blob_location(&key, &content_hash);
        let path = blob_path(&self.dir, &location);
        write_blob(&path, bytes).map_err(|source| CacheError::WriteBlob {
            path: path.clone(),
            source,
        })?;

        let entry = CacheEntry {
            relative_path: key.clone(),
            content_hash,
            blob: location.clone(),
            size: bytes.len() as u64,
            cached_at: utc_timestamp(),
        };
        let previous_update = self.index.last_update.replace(entry.cached_at.clone());
        let replaced = self.index.files.insert(key.clone(), entry);
        if let Err(err) = save_json(&mut self.store, INDEX_KEY, &self.index) {
            self.index.last_update = previous_update;
            match replaced.clone() {
                Some(old) => self.index.files.insert(key.clone(), old),
                None => self.index.files.remove(&key),
            };
            if !self.index.blob_referenced(&location) {
                let _ = remove_blob(&path);
            }
            return Err(err.into());
        }

        if let Some(old) = replaced {
            if old.blob != location && !self.index.blob_referenced(&old.blob) {
                let old_path = blob_path(&self.dir, &old.blob);
                if let Err(err) = remove_blob(&old_path) {
                    warn!(
                        path = %old_path.display(),
                        error = %err,
                        "Failed to remove replaced blob"
                    );
                }
            }
        }
        Ok(true)
    }

    /// Read `absolute_path` and cache it under `relative_path`.
    pub fn put_file(
        &mut self,
        relative_path: &str,
        absolute_path: &Path,
    ) -> Result<bool, CacheError> {
        let bytes = std::fs::read(absolute_path).map_err(|source| CacheError::ReadSource {
            path: absolute_path.to_path_buf(),
            source,
        })?;
        self.put(relative_path, &bytes)
    }

    /// Cached bytes of `relative_path`.
    ///
    /// An index entry whose blob has disappeared is purged and `None` is
    /// returned.
    pub fn get(&mut self, relative_path: &str) -> Option<Vec<u8>> {
        let key = normalize_relative(relative_path);
        let entry = self.index.files.get(&key)?;
        let path = blob_path(&self.dir, &entry.blob);
        match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    path = %key,
                    blob = %path.display(),
                    "Cache blob missing, dropping index entry"
                );
                self.index.files.remove(&key);
                if let Err(err) = save_json(&mut self.store, INDEX_KEY, &self.index) {
                    warn!(error = %err, "Failed to persist cache index after purge");
                }
                None
            }
            Err(err) => {
                warn!(
                    path = %key,
                    blob = %path.display(),
                    error = %err,
                    "Failed to read cache blob"
                );
                None
            }
        }
    }

    /// Cached content of `relative_path` as text, or `None` for binary or
    /// non-UTF-8 content.
    pub fn get_text(&mut self, relative_path: &str) -> Option<String> {
        let bytes = self.get(relative_path)?;
        let sniff = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
        if sniff.contains(&0) {
            return None;
        }
        let text = String::from_utf8(bytes).ok()?;
        Some(match text.strip_prefix('\u{feff}') {
            Some(stripped) => stripped.to_string(),
            None => text,
        })
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.index.files.contains_key(&normalize_relative(relative_path))
    }

    pub fn entry(&self, relative_path: &str) -> Option<&CacheEntry> {
        self.index.files.get(&normalize_relative(relative_path))
    }

    /// Entries ordered by relative path.
    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.index.files.values()
    }

    pub fn info(&self) -> CacheInfo {
        CacheInfo {
            total_files: self.index.files.len(),
            total_size: self.index.files.values().map(|entry| entry.size).sum(),
            last_update: self.index.last_update.clone(),
            cache_dir: self.dir.clone(),
        }
    }

    /// Drop every entry and blob.
    ///
    /// The empty index is persisted before any blob is deleted.
    pub fn clear(&mut self) -> Result<(), CacheError> {
        let cleared = CacheIndex {
            files: Default::default(),
            last_update: Some(utc_timestamp()),
        };
        save_json(&mut self.store, INDEX_KEY, &cleared)?;
        let removed = self.index.files.len();
        self.index = cleared;

        let blobs = self.dir.join(BLOB_DIR);
        match std::fs::remove_dir_all(&blobs) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(CacheError::Clear { path: blobs, source }),
        }
        info!(dir = %self.dir.display(), removed, "Cleared content cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests;
