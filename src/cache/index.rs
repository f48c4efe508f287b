use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Index record for one cached file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub relative_path: String,
    /// SHA-256 of the cached bytes.
    pub content_hash: String,
    /// `/`-separated blob location relative to the cache directory.
    pub blob: String,
    pub size: u64,
    /// RFC 3339 UTC time the blob was written.
    pub cached_at: String,
}

/// Persisted form of the cache index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct CacheIndex {
    #[serde(default)]
    pub(super) files: BTreeMap<String, CacheEntry>,
    #[serde(default)]
    pub(super) last_update: Option<String>,
}

impl CacheIndex {
    /// Whether any entry still points at `blob`.
    pub(super) fn blob_referenced(&self, blob: &str) -> bool {
        self.files.values().any(|entry| entry.blob == blob)
    }
}
