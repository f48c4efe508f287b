//! Minimal record persistence used by the ledger and the cache index.
//!
//! Components talk to a [`RecordStore`] instead of touching JSON files
//! directly, so the backing storage can change without altering their
//! contracts.

mod json_file;
mod memory;

use std::path::PathBuf;

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub use json_file::JsonFileStore;
pub(crate) use json_file::atomic_write;
pub use memory::MemoryStore;

/// Errors raised by record stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to read a record.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to write or remove a record.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A stored record could not be decoded.
    #[error("Corrupt record '{key}': {source}")]
    Corrupt {
        key: String,
        source: serde_json::Error,
    },
    /// A value could not be encoded.
    #[error("Failed to serialize record '{key}': {source}")]
    Serialize {
        key: String,
        source: serde_json::Error,
    },
}

/// Keyed byte-record storage with whole-record replace semantics.
pub trait RecordStore: Send {
    /// Load the record stored under `key`, or `None` if absent.
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    /// Replace the record stored under `key`. Readers never see a partial value.
    fn save(&mut self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
    /// Remove the record under `key`. Removing a missing key succeeds.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Load and decode a JSON record.
pub fn load_json<T, S>(store: &S, key: &str) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
    S: RecordStore + ?Sized,
{
    let Some(bytes) = store.load(key)? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        })
}

/// Encode `value` as pretty JSON and save it under `key`.
pub fn save_json<T, S>(store: &mut S, key: &str, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
    S: RecordStore + ?Sized,
{
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serialize {
        key: key.to_string(),
        source,
    })?;
    store.save(key, &bytes)
}

/// Current UTC time as an RFC 3339 string, used to stamp persisted records.
pub(crate) fn utc_timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::UNIX_EPOCH.to_string())
}
