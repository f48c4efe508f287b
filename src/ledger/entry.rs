use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::VersionTag;
use crate::snapshot::{FileRecord, Snapshot};

/// One committed package version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub tag: VersionTag,
    /// RFC 3339 UTC commit time.
    pub timestamp: String,
    pub file_count: usize,
    pub total_size: u64,
    pub is_full: bool,
    #[serde(default)]
    pub description: String,
}

/// On-disk form of the last committed snapshot.
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct PersistedScan {
    pub(super) tag: VersionTag,
    pub(super) files: BTreeMap<String, PersistedFile>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct PersistedFile {
    size: u64,
    mtime_ns: i64,
    hash: String,
}

impl PersistedScan {
    pub(super) fn new(tag: &VersionTag, snapshot: &Snapshot) -> Self {
        let files = snapshot
            .records()
            .map(|record| {
                (
                    record.relative_path.clone(),
                    PersistedFile {
                        size: record.size,
                        mtime_ns: record.modified_ns,
                        hash: record.content_hash.clone(),
                    },
                )
            })
            .collect();
        Self {
            tag: tag.clone(),
            files,
        }
    }

    pub(super) fn into_snapshot(self) -> Snapshot {
        self.files
            .into_iter()
            .map(|(relative_path, file)| FileRecord {
                relative_path,
                size: file.size,
                modified_ns: file.mtime_ns,
                content_hash: file.hash,
            })
            .collect()
    }
}
