//! End-to-end packaging: scan, diff against the ledger, build, cache, commit.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::archive::{self, ArchiveError, ArchiveSummary, BuildStatus};
use crate::cache::{CacheError, CacheInfo, ContentCache};
use crate::cancel::CancelToken;
use crate::config::{CACHE_DIR_NAME, PackerConfig};
use crate::ledger::{LedgerError, VersionEntry, VersionLedger, VersionTag};
use crate::scanner::{ScanOutcome, Scanner};
use crate::snapshot::{ChangeSummary, FileChange, Snapshot, diff, packaged_paths};

/// Which files a package holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    /// Added and modified files since the last commit.
    Incremental,
    /// Every file in the current snapshot.
    Full,
}

impl PackageKind {
    pub fn is_full(self) -> bool {
        self == PackageKind::Full
    }
}

#[derive(Debug, Error)]
pub enum PackerError {
    #[error("The scan did not complete; rescan before packaging")]
    IncompleteScan,
    #[error("The ledger changed since this scan was taken; rescan before packaging")]
    StaleScan,
    #[error("Nothing to package")]
    NothingToPackage,
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// A scan together with its change set against the last committed snapshot.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub outcome: ScanOutcome,
    pub changes: Vec<FileChange>,
    /// Latest committed tag when the scan was diffed.
    base: Option<VersionTag>,
}

impl ScanReport {
    pub fn summary(&self) -> ChangeSummary {
        ChangeSummary::of(&self.changes)
    }

    pub fn is_complete(&self) -> bool {
        self.outcome.is_complete()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.outcome.snapshot
    }
}

/// Result of [`Packer::package`].
#[derive(Debug, Clone)]
pub enum PackageOutcome {
    Completed {
        entry: VersionEntry,
        archive_path: PathBuf,
        archive: ArchiveSummary,
        /// Paths left out of the archive; they stay pending for the next package.
        skipped: Vec<String>,
        /// Files whose content was stored or refreshed in the cache.
        cached: usize,
        cache_failures: usize,
    },
    /// Canceled during the build; nothing was written or committed.
    Canceled,
}

/// Owns the scanner, ledger and cache for one configured source tree.
pub struct Packer {
    config: PackerConfig,
    scanner: Scanner,
    ledger: VersionLedger,
    cache: ContentCache,
}

impl Packer {
    /// Open the ledger and cache under `<output_root>/cache`.
    ///
    /// Leftover `.zip.partial` files from an interrupted run are removed. When
    /// the output root sits inside the source root, it is kept out of scans.
    pub fn open(config: PackerConfig) -> Result<Self, PackerError> {
        let config = config.normalized();
        let cache_dir = config.cache_dir();
        let ledger = VersionLedger::open(&cache_dir)?;
        let cache = ContentCache::open(&cache_dir)?;
        sweep_partial_archives(&config.output_root);

        let mut policy = config.filter_policy();
        if let Some(subtree) = nested_output_subtree(&config.source_root, &config.output_root) {
            debug!(subtree = %subtree, "Excluding output directory from scans");
            policy = policy.with_excluded_subtree(&subtree);
        }
        let scanner = Scanner::new(policy, config.scan_options());
        Ok(Self {
            config,
            scanner,
            ledger,
            cache,
        })
    }

    pub fn config(&self) -> &PackerConfig {
        &self.config
    }

    pub fn next_tag(&self, kind: PackageKind) -> VersionTag {
        self.ledger.next_tag(kind.is_full())
    }

    /// Where the archive for `tag` is written.
    pub fn archive_path(&self, tag: &VersionTag) -> PathBuf {
        self.config.output_root.join(format!("{tag}.zip"))
    }

    pub fn last_snapshot(&self) -> &Snapshot {
        self.ledger.last_snapshot()
    }

    /// Scan the source root and diff it against the last commit.
    pub fn scan(
        &self,
        cancel: &CancelToken,
        on_progress: &mut impl FnMut(usize, usize),
    ) -> ScanReport {
        let outcome = self
            .scanner
            .scan_with_progress(&self.config.source_root, cancel, on_progress);
        let changes = diff(self.ledger.last_snapshot(), &outcome.snapshot);
        let summary = ChangeSummary::of(&changes);
        info!(
            files = outcome.snapshot.len(),
            added = summary.added,
            modified = summary.modified,
            deleted = summary.deleted,
            complete = outcome.is_complete(),
            "Scan compared with last version"
        );
        ScanReport {
            outcome,
            changes,
            base: self.ledger.latest().map(|entry| entry.tag.clone()),
        }
    }

    /// Build, cache and commit a package from `report`.
    pub fn package(
        &mut self,
        report: &ScanReport,
        kind: PackageKind,
        description: &str,
        cancel: &CancelToken,
        on_progress: &mut impl FnMut(usize, usize),
    ) -> Result<PackageOutcome, PackerError> {
        if !report.is_complete() {
            return Err(PackerError::IncompleteScan);
        }
        if report.base.as_ref() != self.ledger.latest().map(|entry| &entry.tag) {
            return Err(PackerError::StaleScan);
        }
        let paths: Vec<String> = match kind {
            PackageKind::Incremental => packaged_paths(&report.changes),
            PackageKind::Full => report.snapshot().paths().map(String::from).collect(),
        };
        if paths.is_empty() {
            return Err(PackerError::NothingToPackage);
        }

        let tag = self.ledger.next_tag(kind.is_full());
        let archive_path = self.archive_path(&tag);
        let source_root = self.config.source_root.clone();
        let build = archive::build_with_progress(
            &source_root,
            &archive_path,
            &paths,
            cancel,
            on_progress,
        )?;
        if build.status == BuildStatus::Canceled {
            info!(tag = %tag, "Packaging canceled");
            return Ok(PackageOutcome::Canceled);
        }
        if build.written == 0 {
            if let Err(err) = std::fs::remove_file(&archive_path) {
                warn!(
                    path = %archive_path.display(),
                    error = %err,
                    "Failed to remove empty archive"
                );
            }
            info!(tag = %tag, skipped = build.skipped.len(), "Every selected file was skipped");
            return Err(PackerError::NothingToPackage);
        }

        let skipped: HashSet<&str> = build.skipped.iter().map(String::as_str).collect();
        let mut cached = 0;
        let mut cache_failures = 0;
        for path in paths.iter().filter(|path| !skipped.contains(path.as_str())) {
            let absolute = path
                .split('/')
                .fold(source_root.clone(), |acc, segment| acc.join(segment));
            match self.cache.put_file(path, &absolute) {
                Ok(true) => cached += 1,
                Ok(false) => {}
                Err(err) => {
                    cache_failures += 1;
                    warn!(path = %path, error = %err, "Failed to cache packaged file");
                }
            }
        }

        // Files missing from the archive are left out of the committed
        // snapshot so the next diff reports them again.
        let committed: Snapshot = report
            .snapshot()
            .records()
            .filter(|record| !skipped.contains(record.relative_path.as_str()))
            .cloned()
            .collect();
        let entry = self
            .ledger
            .commit(tag, &committed, kind.is_full(), description)?;
        let archive = archive::inspect(&archive_path)?;
        info!(
            tag = %entry.tag,
            files = archive.file_count,
            saved_pct = archive.compression_ratio(),
            "Package complete"
        );
        Ok(PackageOutcome::Completed {
            entry,
            archive_path,
            archive,
            skipped: build.skipped,
            cached,
            cache_failures,
        })
    }

    /// Committed versions, newest first.
    pub fn history(&self) -> Vec<VersionEntry> {
        self.ledger.list_versions()
    }

    /// Content of `relative_path` as of the last package that included it.
    pub fn cached_content(&mut self, relative_path: &str) -> Option<Vec<u8>> {
        self.cache.get(relative_path)
    }

    pub fn cached_text(&mut self, relative_path: &str) -> Option<String> {
        self.cache.get_text(relative_path)
    }

    pub fn cache_info(&self) -> CacheInfo {
        self.cache.info()
    }

    /// Forget all versions and cached content. Archives are left in place.
    pub fn reset(&mut self) -> Result<(), PackerError> {
        self.ledger.reset()?;
        self.cache.clear()?;
        Ok(())
    }
}

/// Relative `/`-separated location of `output_root` inside `source_root`.
///
/// When both are the same directory the cache directory is returned, since
/// that is the part of the output that would otherwise be rescanned.
fn nested_output_subtree(source_root: &Path, output_root: &Path) -> Option<String> {
    let source = resolve(source_root)?;
    let output = resolve(output_root)?;
    let relative = output.strip_prefix(&source).ok()?;
    let segments = relative
        .iter()
        .map(|segment| segment.to_str())
        .collect::<Option<Vec<_>>>()?;
    if segments.is_empty() {
        return Some(CACHE_DIR_NAME.to_string());
    }
    Some(segments.join("/"))
}

fn resolve(path: &Path) -> Option<PathBuf> {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .ok()
}

/// Remove archives left half-written by a run that was killed mid-build.
fn sweep_partial_archives(output_root: &Path) {
    let entries = match std::fs::read_dir(output_root) {
        Ok(entries) => entries,
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    dir = %output_root.display(),
                    error = %err,
                    "Failed to look for partial archives"
                );
            }
            return;
        }
    };
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let is_partial = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(".zip.partial"));
        if !is_partial || !entry.file_type().is_ok_and(|ft| ft.is_file()) {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => info!(path = %path.display(), "Removed partial archive"),
            Err(err) => warn!(
                path = %path.display(),
                error = %err,
                "Failed to remove partial archive"
            ),
        }
    }
}
