use super::*;
use crate::store::MemoryStore;
use tempfile::tempdir;

fn blob_files(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut stack = vec![dir.join(BLOB_DIR)];
    while let Some(next) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&next) else {
            continue;
        };
        for entry in entries {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                found.push(path);
            }
        }
    }
    found
}

#[test]
fn identical_put_writes_a_single_blob() {
    let dir = tempdir().unwrap();
    let mut cache = ContentCache::open(dir.path()).unwrap();
    assert!(cache.put("Mir200/a.txt", b"alpha").unwrap());
    assert!(!cache.put("Mir200/a.txt", b"alpha").unwrap());
    assert!(!cache.put("Mir200\\a.txt", b"alpha").unwrap());
    assert_eq!(blob_files(dir.path()).len(), 1);
    assert_eq!(cache.get("Mir200/a.txt").as_deref(), Some(&b"alpha"[..]));
}

#[test]
fn changed_content_replaces_the_old_blob() {
    let dir = tempdir().unwrap();
    let mut cache = ContentCache::open(dir.path()).unwrap();
    cache.put("a.txt", b"v1").unwrap();
    let first = cache.entry("a.txt").unwrap().clone();
    assert!(cache.put("a.txt", b"v2").unwrap());
    let second = cache.entry("a.txt").unwrap().clone();
    assert_ne!(first.content_hash, second.content_hash);
    assert_eq!(second.content_hash, hash_bytes(b"v2"));
    assert_eq!(blob_files(dir.path()).len(), 1);
    assert!(!blob_path(dir.path(), &first.blob).exists());
    assert_eq!(cache.get("a.txt").as_deref(), Some(&b"v2"[..]));
}

#[test]
fn shared_blob_survives_replacement_of_one_path() {
    let dir = tempdir().unwrap();
    let mut cache = ContentCache::with_store(dir.path(), MemoryStore::new());
    // Two keys that land in the same shard would share a blob; simulate it by
    // pointing a second entry at the first blob.
    cache.put("a.txt", b"same").unwrap();
    let shared = cache.entry("a.txt").unwrap().clone();
    cache.index.files.insert(
        "b.txt".into(),
        CacheEntry {
            relative_path: "b.txt".into(),
            ..shared.clone()
        },
    );
    cache.put("a.txt", b"different").unwrap();
    assert!(blob_path(dir.path(), &shared.blob).is_file());
    assert_eq!(cache.get("b.txt").as_deref(), Some(&b"same"[..]));
}

#[test]
fn index_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let mut cache = ContentCache::open(dir.path()).unwrap();
        cache.put("sub/b.py", b"print(1)\n").unwrap();
    }
    let mut cache = ContentCache::open(dir.path()).unwrap();
    assert!(cache.contains("sub/b.py"));
    assert_eq!(cache.get_text("sub/b.py").as_deref(), Some("print(1)\n"));
    let info = cache.info();
    assert_eq!(info.total_files, 1);
    assert_eq!(info.total_size, 9);
    assert!(info.last_update.is_some());
    assert_eq!(info.cache_dir, dir.path());
}

#[test]
fn missing_blob_purges_the_entry() {
    let dir = tempdir().unwrap();
    let mut cache = ContentCache::open(dir.path()).unwrap();
    cache.put("a.txt", b"alpha").unwrap();
    let blob = blob_path(dir.path(), &cache.entry("a.txt").unwrap().blob);
    std::fs::remove_file(blob).unwrap();

    assert!(cache.get("a.txt").is_none());
    assert!(!cache.contains("a.txt"));
    let reopened = ContentCache::open(dir.path()).unwrap();
    assert!(!reopened.contains("a.txt"));
}

#[test]
fn put_after_lost_blob_rewrites_it() {
    let dir = tempdir().unwrap();
    let mut cache = ContentCache::open(dir.path()).unwrap();
    cache.put("a.txt", b"alpha").unwrap();
    let blob = blob_path(dir.path(), &cache.entry("a.txt").unwrap().blob);
    std::fs::remove_file(&blob).unwrap();
    assert!(cache.put("a.txt", b"alpha").unwrap());
    assert!(blob.is_file());
}

#[test]
fn malformed_index_starts_empty() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join(INDEX_KEY), b"{ broken").unwrap();
    let mut cache = ContentCache::open(dir.path()).unwrap();
    assert!(cache.is_empty());
    assert!(cache.get("anything").is_none());
    cache.put("a.txt", b"alpha").unwrap();
    assert_eq!(cache.len(), 1);
}

#[test]
fn get_text_rejects_binary_and_invalid_utf8() {
    let dir = tempdir().unwrap();
    let mut cache = ContentCache::with_store(dir.path(), MemoryStore::new());
    cache.put("bin.dat", &[0x4d, 0x5a, 0x00, 0x01]).unwrap();
    cache.put("latin1.txt", &[0x63, 0x61, 0x66, 0xe9]).unwrap();
    cache.put("bom.txt", "\u{feff}hello".as_bytes()).unwrap();
    assert!(cache.get("bin.dat").is_some());
    assert!(cache.get_text("bin.dat").is_none());
    assert!(cache.get_text("latin1.txt").is_none());
    assert_eq!(cache.get_text("bom.txt").as_deref(), Some("hello"));
    assert!(cache.get_text("absent.txt").is_none());
}

#[test]
fn put_file_reads_from_disk() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source.txt");
    std::fs::write(&source, b"from disk").unwrap();
    let mut cache = ContentCache::open(dir.path().join("cache")).unwrap();
    assert!(cache.put_file("source.txt", &source).unwrap());
    assert_eq!(cache.entry("source.txt").unwrap().size, 9);

    let err = cache
        .put_file("gone.txt", &dir.path().join("gone.txt"))
        .unwrap_err();
    assert!(matches!(err, CacheError::ReadSource { .. }));
    assert!(matches!(
        cache.put("./", b"x").unwrap_err(),
        CacheError::InvalidPath(_)
    ));
}

#[test]
fn clear_empties_index_and_blobs() {
    let dir = tempdir().unwrap();
    let mut cache = ContentCache::open(dir.path()).unwrap();
    cache.put("a.txt", b"alpha").unwrap();
    cache.put("b/c.txt", b"gamma").unwrap();
    cache.clear().unwrap();
    assert!(cache.is_empty());
    assert!(!dir.path().join(BLOB_DIR).exists());
    assert!(cache.get("a.txt").is_none());
    assert_eq!(cache.info().total_files, 0);

    let reopened = ContentCache::open(dir.path()).unwrap();
    assert!(reopened.is_empty());
    cache.clear().unwrap();
}
