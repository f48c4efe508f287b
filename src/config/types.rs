use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::filter::FilterPolicy;
use crate::scanner::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_WORKERS, ScanOptions};

/// Directory under `output_root` holding the ledger and the content cache.
pub const CACHE_DIR_NAME: &str = "cache";

/// Settings for one packaged source tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackerConfig {
    /// Tree that gets scanned and packaged.
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,
    /// Where archives and the `cache/` directory are written.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    #[serde(default)]
    pub filters: FilterSettings,
    #[serde(default)]
    pub scan: ScanSettings,
}

/// Inclusion rules, see [`FilterPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSettings {
    /// Subtrees or single files to scan; empty scans the whole source root.
    #[serde(default)]
    pub target_paths: Vec<String>,
    #[serde(default)]
    pub exclude_files: Vec<String>,
    #[serde(default = "default_exclude_folders")]
    pub exclude_folders: Vec<String>,
    #[serde(default = "default_exclude_extensions")]
    pub exclude_extensions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSettings {
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            output_root: default_output_root(),
            filters: FilterSettings::default(),
            scan: ScanSettings::default(),
        }
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            target_paths: Vec::new(),
            exclude_files: Vec::new(),
            exclude_folders: default_exclude_folders(),
            exclude_extensions: default_exclude_extensions(),
        }
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl PackerConfig {
    /// Clamp values that would stall a scan.
    pub fn normalized(mut self) -> Self {
        self.scan.max_workers = self.scan.max_workers.max(1);
        self.scan.chunk_size = self.scan.chunk_size.max(1);
        self
    }

    /// Resolve relative roots against `base`, typically the config file's
    /// directory.
    pub fn resolved_against(mut self, base: &Path) -> Self {
        if self.source_root.is_relative() {
            self.source_root = base.join(&self.source_root);
        }
        if self.output_root.is_relative() {
            self.output_root = base.join(&self.output_root);
        }
        self
    }

    pub fn filter_policy(&self) -> FilterPolicy {
        FilterPolicy::new(
            &self.filters.target_paths,
            &self.filters.exclude_files,
            &self.filters.exclude_folders,
            &self.filters.exclude_extensions,
        )
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            max_workers: self.scan.max_workers.max(1),
            chunk_size: self.scan.chunk_size.max(1),
        }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.output_root.join(CACHE_DIR_NAME)
    }
}

fn default_source_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_root() -> PathBuf {
    PathBuf::from("output")
}

fn default_exclude_folders() -> Vec<String> {
    vec!["Log".to_string()]
}

fn default_exclude_extensions() -> Vec<String> {
    [".log", ".zip", ".dll", ".exe", ".json"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
