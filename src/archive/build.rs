use std::{
    collections::HashSet,
    fs::File,
    io::{BufWriter, Read, Write},
    path::{Component, Path, PathBuf},
};

use tracing::{info, warn};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use super::{ArchiveError, BuildReport, BuildStatus, COMPRESSION_LEVEL};
use crate::cancel::CancelToken;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Removes the in-progress archive unless the build reached the final rename.
struct PartialArchive {
    path: PathBuf,
    armed: bool,
}

impl PartialArchive {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PartialArchive {
    fn drop(&mut self) {
        if self.armed {
            if let Err(err) = std::fs::remove_file(&self.path) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        path = %self.path.display(),
                        error = %err,
                        "Failed to remove partial archive"
                    );
                }
            }
        }
    }
}

enum EntryOutcome {
    Written,
    Skipped(String),
}

/// Build `output_path` from `relative_paths` under `source_root`.
pub fn build<P: AsRef<str>>(
    source_root: &Path,
    output_path: &Path,
    relative_paths: &[P],
    cancel: &CancelToken,
) -> Result<BuildReport, ArchiveError> {
    build_with_progress(source_root, output_path, relative_paths, cancel, &mut |_, _| {})
}

/// Build `output_path`, calling `on_progress(processed, total)` once per
/// requested path in input order.
///
/// The archive is assembled in a sibling `.partial` file and only renamed to
/// `output_path` once complete. Unsafe, missing or unreadable paths are
/// skipped. Cancellation is checked between files and leaves nothing behind.
pub fn build_with_progress<P: AsRef<str>>(
    source_root: &Path,
    output_path: &Path,
    relative_paths: &[P],
    cancel: &CancelToken,
    on_progress: &mut dyn FnMut(usize, usize),
) -> Result<BuildReport, ArchiveError> {
    let file_name = output_path
        .file_name()
        .ok_or_else(|| ArchiveError::InvalidOutput(output_path.to_path_buf()))?;
    let partial_path =
        output_path.with_file_name(format!("{}.partial", file_name.to_string_lossy()));
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ArchiveError::Create {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = File::create(&partial_path).map_err(|source| ArchiveError::Create {
        path: partial_path.clone(),
        source,
    })?;
    let mut guard = PartialArchive {
        path: partial_path.clone(),
        armed: true,
    };

    let mut zip = ZipWriter::new(BufWriter::new(file));
    let total = relative_paths.len();
    let mut report = BuildReport {
        status: BuildStatus::Completed,
        written: 0,
        skipped: Vec::new(),
    };
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut names = HashSet::new();

    for (idx, requested) in relative_paths.iter().enumerate() {
        if cancel.is_canceled() {
            report.status = BuildStatus::Canceled;
            break;
        }
        let requested = requested.as_ref();
        let outcome = match entry_name(requested) {
            None => EntryOutcome::Skipped("unsafe path".into()),
            Some(name) if names.contains(&name) => {
                EntryOutcome::Skipped(format!("duplicate of entry '{name}'"))
            }
            Some(name) => {
                let outcome =
                    add_entry(&mut zip, source_root, &name, &partial_path, &mut buffer)?;
                if matches!(outcome, EntryOutcome::Written) {
                    names.insert(name);
                }
                outcome
            }
        };
        match outcome {
            EntryOutcome::Written => report.written += 1,
            EntryOutcome::Skipped(reason) => {
                warn!(path = %requested, reason = %reason, "Skipping file in archive");
                report.skipped.push(requested.to_string());
            }
        }
        on_progress(idx + 1, total);
    }

    if report.status == BuildStatus::Canceled {
        drop(zip);
        drop(guard);
        info!(
            archive = %output_path.display(),
            written = report.written,
            "Archive build canceled"
        );
        return Ok(report);
    }

    let writer = zip.finish().map_err(|source| ArchiveError::Zip {
        path: partial_path.clone(),
        source,
    })?;
    let file = writer.into_inner().map_err(|err| ArchiveError::Write {
        path: partial_path.clone(),
        source: err.into_error(),
    })?;
    file.sync_all().map_err(|source| ArchiveError::Write {
        path: partial_path.clone(),
        source,
    })?;
    drop(file);
    std::fs::rename(&partial_path, output_path).map_err(|source| ArchiveError::Write {
        path: output_path.to_path_buf(),
        source,
    })?;
    guard.disarm();
    info!(
        archive = %output_path.display(),
        written = report.written,
        skipped = report.skipped.len(),
        "Archive built"
    );
    Ok(report)
}

/// Copy `source_root/name` into the archive as entry `name`.
fn add_entry<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    source_root: &Path,
    name: &str,
    archive_path: &Path,
    buffer: &mut [u8],
) -> Result<EntryOutcome, ArchiveError> {
    let source = name
        .split('/')
        .fold(source_root.to_path_buf(), |path, segment| path.join(segment));
    let mut file = match File::open(&source) {
        Ok(file) => file,
        Err(err) => return Ok(EntryOutcome::Skipped(err.to_string())),
    };
    let len = match file.metadata() {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) => return Ok(EntryOutcome::Skipped("not a regular file".into())),
        Err(err) => return Ok(EntryOutcome::Skipped(err.to_string())),
    };

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL))
        .large_file(len >= u64::from(u32::MAX));
    let zip_error = |source: zip::result::ZipError| ArchiveError::Zip {
        path: archive_path.to_path_buf(),
        source,
    };
    zip.start_file(name, options).map_err(zip_error)?;
    loop {
        let read = match file.read(buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => {
                zip.abort_file().map_err(zip_error)?;
                return Ok(EntryOutcome::Skipped(err.to_string()));
            }
        };
        zip.write_all(&buffer[..read])
            .map_err(|source| ArchiveError::Write {
                path: archive_path.to_path_buf(),
                source,
            })?;
    }
    Ok(EntryOutcome::Written)
}

/// `/`-separated entry name for a requested path, or `None` when the path is
/// absolute or escapes the source root.
pub(super) fn entry_name(requested: &str) -> Option<String> {
    let unified = requested.replace('\\', "/");
    if unified.starts_with('/') {
        return None;
    }
    let mut segments = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            other if has_drive_prefix(other) => return None,
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}

/// Whether `segment` would leave the source root on this platform, such as a
/// `C:` drive prefix on Windows. `:` is an ordinary file name character on
/// Unix.
fn has_drive_prefix(segment: &str) -> bool {
    Path::new(segment)
        .components()
        .any(|component| matches!(component, Component::Prefix(_) | Component::RootDir))
}
