use std::{fs::File, io::Read, path::Path};

use zip::{ZipArchive, result::ZipError};

use super::{ArchiveEntry, ArchiveError, ArchiveSummary};

/// Upper bound on the buffer reserved up front from an entry's declared size.
const MAX_PREALLOCATION: u64 = 1024 * 1024;

fn open(archive_path: &Path) -> Result<ZipArchive<File>, ArchiveError> {
    let file = File::open(archive_path).map_err(|source| ArchiveError::Open {
        path: archive_path.to_path_buf(),
        source,
    })?;
    ZipArchive::new(file).map_err(|source| ArchiveError::Zip {
        path: archive_path.to_path_buf(),
        source,
    })
}

/// List the file entries of an archive without extracting anything.
pub fn inspect(archive_path: &Path) -> Result<ArchiveSummary, ArchiveError> {
    let mut archive = open(archive_path)?;
    let mut entries = Vec::with_capacity(archive.len());
    for idx in 0..archive.len() {
        let entry = archive.by_index(idx).map_err(|source| ArchiveError::Zip {
            path: archive_path.to_path_buf(),
            source,
        })?;
        if entry.is_dir() {
            continue;
        }
        entries.push(ArchiveEntry {
            name: entry.name().to_string(),
            size: entry.size(),
            compressed_size: entry.compressed_size(),
        });
    }
    Ok(ArchiveSummary {
        file_count: entries.len(),
        total_size: entries.iter().map(|entry| entry.size).sum(),
        compressed_size: entries.iter().map(|entry| entry.compressed_size).sum(),
        entries,
    })
}

/// Decompressed bytes of entry `name`.
pub fn read_entry(archive_path: &Path, name: &str) -> Result<Vec<u8>, ArchiveError> {
    let mut archive = open(archive_path)?;
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            return Err(ArchiveError::MissingEntry {
                archive: archive_path.to_path_buf(),
                name: name.to_string(),
            });
        }
        Err(source) => {
            return Err(ArchiveError::Zip {
                path: archive_path.to_path_buf(),
                source,
            });
        }
    };
    let mut bytes = Vec::with_capacity(entry.size().min(MAX_PREALLOCATION) as usize);
    entry
        .read_to_end(&mut bytes)
        .map_err(|source| ArchiveError::Open {
            path: archive_path.to_path_buf(),
            source,
        })?;
    Ok(bytes)
}
