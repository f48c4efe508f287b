//! Append-only record of committed package versions.
//!
//! The ledger persists two records: the version list and the snapshot of the
//! most recent commit. The version list is always written first and the
//! snapshot carries the tag it belongs to, so a snapshot from an unfinished
//! commit is recognised and ignored on the next load.

mod entry;
mod tag;

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::snapshot::Snapshot;
use crate::store::{JsonFileStore, RecordStore, StoreError, load_json, save_json, utc_timestamp};

pub use entry::VersionEntry;
pub use tag::{TagParseError, VersionTag};

use entry::PersistedScan;

/// Record key of the version list.
pub const VERSIONS_KEY: &str = "versions.json";
/// Record key of the last committed snapshot.
pub const LATEST_SCAN_KEY: &str = "latest_scan.json";

/// Errors raised by [`VersionLedger`] operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Version {tag} is not newer than the latest committed version {latest}")]
    NonMonotonicTag { tag: VersionTag, latest: VersionTag },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Committed versions plus the snapshot of the latest commit.
pub struct VersionLedger<S: RecordStore = JsonFileStore> {
    store: S,
    entries: Vec<VersionEntry>,
    last_snapshot: Snapshot,
}

impl VersionLedger<JsonFileStore> {
    /// Open the ledger stored in `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let store = JsonFileStore::open(dir)?;
        Ok(Self::with_store(store))
    }
}

impl<S: RecordStore> VersionLedger<S> {
    /// Load ledger state from `store`.
    ///
    /// Missing records mean an empty ledger. Unreadable or malformed records
    /// are logged and treated as empty.
    pub fn with_store(store: S) -> Self {
        let entries = match load_json::<Vec<VersionEntry>, _>(&store, VERSIONS_KEY) {
            Ok(entries) => entries.unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, "Version list unusable, starting empty");
                Vec::new()
            }
        };
        let last_snapshot = match load_json::<PersistedScan, _>(&store, LATEST_SCAN_KEY) {
            Ok(Some(scan)) if entries.iter().any(|entry| entry.tag == scan.tag) => {
                scan.into_snapshot()
            }
            Ok(Some(scan)) => {
                warn!(tag = %scan.tag, "Ignoring snapshot from an unrecorded version");
                Snapshot::new()
            }
            Ok(None) => Snapshot::new(),
            Err(err) => {
                warn!(error = %err, "Last snapshot unusable, starting empty");
                Snapshot::new()
            }
        };
        debug!(
            versions = entries.len(),
            files = last_snapshot.len(),
            "Loaded version ledger"
        );
        Self {
            store,
            entries,
            last_snapshot,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest committed version.
    pub fn latest(&self) -> Option<&VersionEntry> {
        self.entries.iter().max_by(|a, b| a.tag.cmp(&b.tag))
    }

    /// Tag the next commit should use.
    pub fn next_tag(&self, is_full: bool) -> VersionTag {
        match self.latest() {
            None => VersionTag::initial(),
            Some(latest) if is_full => latest.tag.bump_major(),
            Some(latest) => latest.tag.bump_minor(),
        }
    }

    /// Record `snapshot` as version `tag`.
    ///
    /// `tag` must be strictly greater than every committed tag. On a
    /// persistence failure nothing changes in memory.
    pub fn commit(
        &mut self,
        tag: VersionTag,
        snapshot: &Snapshot,
        is_full: bool,
        description: impl Into<String>,
    ) -> Result<VersionEntry, LedgerError> {
        if let Some(latest) = self.latest() {
            if tag <= latest.tag {
                return Err(LedgerError::NonMonotonicTag {
                    tag,
                    latest: latest.tag.clone(),
                });
            }
        }
        let entry = VersionEntry {
            tag: tag.clone(),
            timestamp: utc_timestamp(),
            file_count: snapshot.len(),
            total_size: snapshot.total_size(),
            is_full,
            description: description.into(),
        };

        self.entries.push(entry.clone());
        if let Err(err) = save_json(&mut self.store, VERSIONS_KEY, &self.entries) {
            self.entries.pop();
            return Err(err.into());
        }
        if let Err(err) = save_json(
            &mut self.store,
            LATEST_SCAN_KEY,
            &PersistedScan::new(&tag, snapshot),
        ) {
            self.entries.pop();
            if let Err(restore) = save_json(&mut self.store, VERSIONS_KEY, &self.entries) {
                warn!(error = %restore, "Failed to restore version list after aborted commit");
            }
            return Err(err.into());
        }
        self.last_snapshot = snapshot.clone();
        info!(
            tag = %entry.tag,
            files = entry.file_count,
            full = entry.is_full,
            "Committed version"
        );
        Ok(entry)
    }

    /// Snapshot of the latest commit; empty before the first one.
    pub fn last_snapshot(&self) -> &Snapshot {
        &self.last_snapshot
    }

    /// Committed versions, newest first.
    pub fn list_versions(&self) -> Vec<VersionEntry> {
        let mut versions = self.entries.clone();
        versions.sort_by(|a, b| b.tag.cmp(&a.tag));
        versions
    }

    /// Forget every version and the last snapshot.
    pub fn reset(&mut self) -> Result<(), LedgerError> {
        self.store.remove(LATEST_SCAN_KEY)?;
        self.store.remove(VERSIONS_KEY)?;
        let removed = self.entries.len();
        self.entries.clear();
        self.last_snapshot = Snapshot::new();
        info!(removed, "Reset version ledger");
        Ok(())
    }
}
