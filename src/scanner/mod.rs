//! Content scanner: enumerates target subtrees and fingerprints each file on a
//! bounded worker pool.

mod hash;
mod pool;
mod walk;

use std::{
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::filter::FilterPolicy;
use crate::snapshot::{FileRecord, Snapshot};

pub use hash::{DEFAULT_CHUNK_SIZE, hash_bytes, hash_file};

use pool::run_workers;
use walk::{Candidate, collect_candidates};

/// Default upper bound on hashing threads.
pub const DEFAULT_MAX_WORKERS: usize = 8;

/// Tuning knobs for a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Upper bound on concurrent hashing threads.
    pub max_workers: usize,
    /// Bytes read per hash chunk.
    pub chunk_size: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Whether a scan ran to the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// Every candidate was processed.
    Completed,
    /// The cancel token fired; the snapshot is partial.
    Canceled,
}

/// Counters for one scan run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    /// Files selected by the filter policy.
    pub candidates: usize,
    /// Files fingerprinted into the snapshot.
    pub hashed: usize,
    /// Files dropped because they could not be read.
    pub skipped: usize,
    /// Files whose hashing was stopped by cancellation.
    pub interrupted: usize,
}

/// Result of [`Scanner::scan`].
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub snapshot: Snapshot,
    pub status: ScanStatus,
    pub stats: ScanStats,
}

impl ScanOutcome {
    fn empty() -> Self {
        Self {
            snapshot: Snapshot::new(),
            status: ScanStatus::Completed,
            stats: ScanStats::default(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == ScanStatus::Completed
    }
}

enum FileOutcome {
    Hashed(FileRecord),
    Failed {
        relative: String,
        error: std::io::Error,
    },
    Interrupted,
}

/// Scans a source root into a [`Snapshot`].
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    policy: FilterPolicy,
    options: ScanOptions,
}

impl Scanner {
    pub fn new(policy: FilterPolicy, options: ScanOptions) -> Self {
        Self { policy, options }
    }

    pub fn policy(&self) -> &FilterPolicy {
        &self.policy
    }

    pub fn options(&self) -> ScanOptions {
        self.options
    }

    /// Scan `root` without progress reporting.
    pub fn scan(&self, root: &Path, cancel: &CancelToken) -> ScanOutcome {
        self.run(root, cancel, None)
    }

    /// Scan `root`, calling `on_progress(processed, total)` once per finished
    /// file.
    ///
    /// Calls happen on the calling thread in completion order, so the callback
    /// needs no synchronization of its own.
    pub fn scan_with_progress(
        &self,
        root: &Path,
        cancel: &CancelToken,
        on_progress: &mut impl FnMut(usize, usize),
    ) -> ScanOutcome {
        self.run(root, cancel, Some(on_progress))
    }

    fn run(
        &self,
        root: &Path,
        cancel: &CancelToken,
        mut on_progress: Option<&mut dyn FnMut(usize, usize)>,
    ) -> ScanOutcome {
        if !root.is_dir() {
            debug!(root = %root.display(), "Scan root is missing or not a directory");
            return ScanOutcome::empty();
        }

        let walk = collect_candidates(root, &self.policy, cancel);
        let total = walk.candidates.len();
        let mut stats = ScanStats {
            candidates: total,
            ..ScanStats::default()
        };
        let mut snapshot = Snapshot::new();
        let mut processed = 0;
        let chunk_size = self.options.chunk_size;

        run_workers(
            walk.candidates,
            self.options.max_workers,
            cancel,
            |candidate| fingerprint(candidate, chunk_size, cancel),
            |outcome| {
                match outcome {
                    FileOutcome::Hashed(record) => {
                        stats.hashed += 1;
                        snapshot.insert(record);
                    }
                    FileOutcome::Failed { relative, error } => {
                        stats.skipped += 1;
                        warn!(path = %relative, error = %error, "Skipping unreadable file");
                    }
                    FileOutcome::Interrupted => {
                        stats.interrupted += 1;
                        return;
                    }
                }
                processed += 1;
                if let Some(on_progress) = on_progress.as_mut() {
                    on_progress(processed, total);
                }
            },
        );

        let status = if walk.canceled || stats.interrupted > 0 || processed < total {
            ScanStatus::Canceled
        } else {
            ScanStatus::Completed
        };
        info!(
            root = %root.display(),
            files = stats.hashed,
            skipped = stats.skipped,
            canceled = status == ScanStatus::Canceled,
            "Scan finished"
        );
        ScanOutcome {
            snapshot,
            status,
            stats,
        }
    }
}

fn fingerprint(candidate: Candidate, chunk_size: usize, cancel: &CancelToken) -> FileOutcome {
    let Candidate { relative, absolute } = candidate;
    let meta = match absolute.metadata() {
        Ok(meta) => meta,
        Err(error) => return FileOutcome::Failed { relative, error },
    };
    let content_hash = match hash_file(&absolute, chunk_size, cancel) {
        Ok(Some(hash)) => hash,
        Ok(None) => return FileOutcome::Interrupted,
        Err(error) => return FileOutcome::Failed { relative, error },
    };
    let modified_ns = meta.modified().map(to_nanos).unwrap_or(0);
    FileOutcome::Hashed(FileRecord {
        relative_path: relative,
        size: meta.len(),
        modified_ns,
        content_hash,
    })
}

fn to_nanos(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_nanos().min(i64::MAX as u128) as i64,
        Err(before) => -(before.duration().as_nanos().min(i64::MAX as u128) as i64),
    }
}
