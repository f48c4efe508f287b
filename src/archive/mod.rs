//! Deflate zip packages of selected files, plus read-only inspection.

mod build;
mod inspect;

use std::path::PathBuf;

use thiserror::Error;

pub use build::{build, build_with_progress};
pub use inspect::{inspect, read_entry};

/// Deflate level used for package entries.
pub const COMPRESSION_LEVEL: i64 = 6;

/// Errors that abort a whole archive operation.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archive path has no file name: {0}")]
    InvalidOutput(PathBuf),
    #[error("Failed to create archive {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write archive {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to open archive {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Zip error in {path}: {source}")]
    Zip {
        path: PathBuf,
        source: zip::result::ZipError,
    },
    #[error("Archive {archive} has no entry named '{name}'")]
    MissingEntry { archive: PathBuf, name: String },
}

/// How a build ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    Completed,
    /// Stopped by the cancel token; no archive was left on disk.
    Canceled,
}

/// Result of a build that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub status: BuildStatus,
    /// Entries written to the archive.
    pub written: usize,
    /// Requested paths left out because they were unsafe, missing or unreadable.
    pub skipped: Vec<String>,
}

impl BuildReport {
    pub fn succeeded(&self) -> bool {
        self.status == BuildStatus::Completed
    }
}

/// One file entry of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub size: u64,
    pub compressed_size: u64,
}

/// Read-only summary of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub file_count: usize,
    pub total_size: u64,
    pub compressed_size: u64,
    pub entries: Vec<ArchiveEntry>,
}

impl ArchiveSummary {
    /// Percentage of the uncompressed size saved by compression.
    pub fn compression_ratio(&self) -> f64 {
        if self.total_size == 0 {
            return 0.0;
        }
        (1.0 - self.compressed_size as f64 / self.total_size as f64) * 100.0
    }
}
