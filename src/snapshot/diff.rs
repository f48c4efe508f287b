use serde::{Deserialize, Serialize};

use super::{FileRecord, Snapshot};

/// Classification of a path between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

/// Fingerprint fields for one side of a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileState {
    pub hash: String,
    pub size: u64,
    pub modified_ns: i64,
}

impl From<&FileRecord> for FileState {
    fn from(record: &FileRecord) -> Self {
        Self {
            hash: record.content_hash.clone(),
            size: record.size,
            modified_ns: record.modified_ns,
        }
    }
}

/// A single classified difference.
///
/// Only the constructors can build one, so `Added` never carries an old side,
/// `Deleted` never carries a new side and `Modified` always has two sides with
/// different hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    relative_path: String,
    kind: ChangeKind,
    old: Option<FileState>,
    new: Option<FileState>,
}

impl FileChange {
    pub fn added(current: &FileRecord) -> Self {
        Self {
            relative_path: current.relative_path.clone(),
            kind: ChangeKind::Added,
            old: None,
            new: Some(current.into()),
        }
    }

    pub fn deleted(previous: &FileRecord) -> Self {
        Self {
            relative_path: previous.relative_path.clone(),
            kind: ChangeKind::Deleted,
            old: Some(previous.into()),
            new: None,
        }
    }

    /// Returns `None` when both records carry the same hash.
    pub fn modified(previous: &FileRecord, current: &FileRecord) -> Option<Self> {
        if previous.content_hash == current.content_hash {
            return None;
        }
        Some(Self {
            relative_path: current.relative_path.clone(),
            kind: ChangeKind::Modified,
            old: Some(previous.into()),
            new: Some(current.into()),
        })
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn old(&self) -> Option<&FileState> {
        self.old.as_ref()
    }

    pub fn new_state(&self) -> Option<&FileState> {
        self.new.as_ref()
    }

    pub fn old_hash(&self) -> Option<&str> {
        self.old.as_ref().map(|state| state.hash.as_str())
    }

    pub fn new_hash(&self) -> Option<&str> {
        self.new.as_ref().map(|state| state.hash.as_str())
    }
}

/// Compare two snapshots and classify every differing path.
///
/// Output is sorted by relative path. An empty `previous` reports every
/// current file as added.
pub fn diff(previous: &Snapshot, current: &Snapshot) -> Vec<FileChange> {
    let mut changes = Vec::new();
    for record in current.records() {
        match previous.get(&record.relative_path) {
            None => changes.push(FileChange::added(record)),
            Some(old) => changes.extend(FileChange::modified(old, record)),
        }
    }
    for record in previous.records() {
        if !current.contains(&record.relative_path) {
            changes.push(FileChange::deleted(record));
        }
    }
    changes.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    changes
}

/// Paths that belong in an incremental package (added or modified).
pub fn packaged_paths(changes: &[FileChange]) -> Vec<String> {
    changes
        .iter()
        .filter(|change| change.kind != ChangeKind::Deleted)
        .map(|change| change.relative_path.clone())
        .collect()
}

/// Per-kind counts for a change set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChangeSummary {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
}

impl ChangeSummary {
    pub fn of(changes: &[FileChange]) -> Self {
        let mut summary = Self::default();
        for change in changes {
            match change.kind {
                ChangeKind::Added => summary.added += 1,
                ChangeKind::Modified => summary.modified += 1,
                ChangeKind::Deleted => summary.deleted += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.added + self.modified + self.deleted
    }

    /// Number of files an incremental package would contain.
    pub fn packaged(&self) -> usize {
        self.added + self.modified
    }
}
