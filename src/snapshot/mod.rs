//! Point-in-time file fingerprints and the differ that compares them.

mod diff;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use diff::{ChangeKind, ChangeSummary, FileChange, FileState, diff, packaged_paths};

/// Fingerprint of one file under the source root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// `/`-separated path relative to the source root.
    pub relative_path: String,
    pub size: u64,
    pub modified_ns: i64,
    /// Lower-case hex SHA-256 of the file bytes.
    pub content_hash: String,
}

/// Complete mapping of relative paths to fingerprints produced by one scan.
///
/// Snapshots are built wholesale and never edited afterwards; a rescan yields a
/// new value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    files: BTreeMap<String, FileRecord>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, relative_path: &str) -> Option<&FileRecord> {
        self.files.get(relative_path)
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.files.contains_key(relative_path)
    }

    /// Records ordered by relative path.
    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.values()
    }

    /// Relative paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Sum of all file sizes in bytes.
    pub fn total_size(&self) -> u64 {
        self.files.values().map(|record| record.size).sum()
    }

    pub(crate) fn insert(&mut self, record: FileRecord) {
        self.files.insert(record.relative_path.clone(), record);
    }
}

impl FromIterator<FileRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for record in iter {
            snapshot.insert(record);
        }
        snapshot
    }
}
