use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use tracing::warn;

use crate::cancel::CancelToken;
use crate::filter::FilterPolicy;

/// A file selected for fingerprinting.
#[derive(Debug, Clone)]
pub(super) struct Candidate {
    pub(super) relative: String,
    pub(super) absolute: PathBuf,
}

pub(super) struct WalkResult {
    pub(super) candidates: Vec<Candidate>,
    pub(super) canceled: bool,
}

/// Enumerate files under the policy's target subtrees.
///
/// Only targets are visited; excluded folders are never entered and symlinks
/// are never followed. Unreadable directories are logged and skipped.
pub(super) fn collect_candidates(
    root: &Path,
    policy: &FilterPolicy,
    cancel: &CancelToken,
) -> WalkResult {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    let mut stack: Vec<(PathBuf, String)> = Vec::new();

    if policy.targets().is_empty() {
        stack.push((root.to_path_buf(), String::new()));
    }
    for target in policy.targets() {
        if target.split('/').any(|segment| policy.excludes_folder(segment))
            || policy.excludes_subtree(target)
        {
            continue;
        }
        let absolute = root.join(target);
        let file_type = match fs::symlink_metadata(&absolute) {
            Ok(meta) => meta.file_type(),
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        path = %absolute.display(),
                        error = %err,
                        "Failed to read scan target"
                    );
                }
                continue;
            }
        };
        if file_type.is_dir() {
            stack.push((absolute, target.clone()));
        } else if file_type.is_file() && policy.included(target) && seen.insert(target.clone()) {
            candidates.push(Candidate {
                relative: target.clone(),
                absolute,
            });
        }
    }

    while let Some((dir, prefix)) = stack.pop() {
        if cancel.is_canceled() {
            return WalkResult {
                candidates,
                canceled: true,
            };
        }
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    dir = %dir.display(),
                    error = %err,
                    "Failed to read directory during scan"
                );
                continue;
            }
        };
        for entry_result in entries {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(
                        dir = %dir.display(),
                        error = %err,
                        "Failed to read directory entry during scan"
                    );
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "Failed to read file type during scan"
                    );
                    continue;
                }
            };
            if file_type.is_symlink() {
                continue;
            }
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(
                        dir = %dir.display(),
                        name = ?raw,
                        "Skipping entry with a non-UTF-8 name"
                    );
                    continue;
                }
            };
            let relative = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}/{name}")
            };
            if file_type.is_dir() {
                if !policy.excludes_folder(&name) && !policy.excludes_subtree(&relative) {
                    stack.push((path, relative));
                }
                continue;
            }
            if file_type.is_file() && policy.included(&relative) && seen.insert(relative.clone()) {
                candidates.push(Candidate {
                    relative,
                    absolute: path,
                });
            }
        }
    }

    candidates.sort_by(|a, b| a.relative.cmp(&b.relative));
    WalkResult {
        candidates,
        canceled: false,
    }
}
