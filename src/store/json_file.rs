use std::{
    io::Write,
    path::{Path, PathBuf},
};

use super::{RecordStore, StoreError};

/// One file per key inside a directory, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Use `dir` as the record directory, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Write {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl RecordStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read { path, source }),
        }
    }

    fn save(&mut self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key);
        atomic_write(&path, bytes).map_err(|source| StoreError::Write { path, source })
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Write { path, source }),
        }
    }
}

/// Write `data` to a uniquely named sibling temp file, fsync it and rename it
/// over `path`, so a crash leaves either the old or the new contents.
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use rand::TryRngCore;
    let dir = match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => return Err(std::io::Error::other("record path has no parent directory")),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| std::io::Error::other("record path has no file name"))?;

    let mut last_err = None;
    for _ in 0..5 {
        let mut bytes = [0u8; 6];
        rand::rngs::OsRng.try_fill_bytes(&mut bytes).map_err(|source| {
            std::io::Error::other(format!("failed to generate temporary file suffix: {source}"))
        })?;
        let suffix: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        let tmp_path = dir.join(format!("{}.tmp-{}", file_name.to_string_lossy(), suffix));

        let file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path);
        let mut file = match file {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                last_err = Some(err);
                continue;
            }
            Err(err) => return Err(err),
        };

        if let Err(err) = file.write_all(data).and_then(|_| file.sync_all()) {
            drop(file);
            let _ = std::fs::remove_file(&tmp_path);
            return Err(err);
        }
        drop(file);
        if let Err(err) = replace_file(&tmp_path, path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(err);
        }
        sync_parent_dir(dir)?;
        return Ok(());
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        format!(
            "failed to create temporary file for {}: {}",
            path.display(),
            last_err
                .as_ref()
                .map(|err| err.to_string())
                .unwrap_or_else(|| "unknown error".into())
        ),
    ))
}

fn replace_file(temp_path: &Path, path: &Path) -> std::io::Result<()> {
    match std::fs::rename(temp_path, path) {
        Ok(()) => Ok(()),
        Err(err) => {
            #[cfg(target_os = "windows")]
            if err.kind() == std::io::ErrorKind::AlreadyExists
                || err.kind() == std::io::ErrorKind::PermissionDenied
            {
                if let Err(inner) = std::fs::remove_file(path) {
                    if inner.kind() != std::io::ErrorKind::NotFound {
                        return Err(inner);
                    }
                }
                std::fs::rename(temp_path, path)?;
                return Ok(());
            }
            Err(err)
        }
    }
}

fn sync_parent_dir(dir: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        std::fs::File::open(dir)?.sync_all()?;
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_key_loads_as_none() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("records")).unwrap();
        assert!(store.load("absent.json").unwrap().is_none());
        assert!(store.dir().is_dir());
    }

    #[test]
    fn save_replaces_contents_without_leaving_temp_files() {
        let dir = tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path()).unwrap();
        store.save("a.json", b"first").unwrap();
        store.save("a.json", b"second").unwrap();
        assert_eq!(store.load("a.json").unwrap().as_deref(), Some(&b"second"[..]));
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.json".to_string()]);
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path()).unwrap();
        store.save("a.json", b"x").unwrap();
        store.remove("a.json").unwrap();
        store.remove("a.json").unwrap();
        assert!(!store.path_for("a.json").exists());
    }
}
