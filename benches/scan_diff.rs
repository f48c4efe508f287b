use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use deltapack::cancel::CancelToken;
use deltapack::filter::FilterPolicy;
use deltapack::scanner::{ScanOptions, Scanner, hash_bytes};
use deltapack::snapshot::{FileRecord, Snapshot, diff};
use tempfile::{TempDir, tempdir};

const TREE_FILES: usize = 500;
const SNAPSHOT_FILES: usize = 20_000;

fn setup_tree() -> TempDir {
    let dir = tempdir().expect("tempdir");
    for i in 0..TREE_FILES {
        let sub = dir.path().join(format!("dir{}", i % 20));
        std::fs::create_dir_all(&sub).expect("create dir");
        let data = format!("file {i}\n").repeat(64);
        std::fs::write(sub.join(format!("{i}.txt")), data).expect("write file");
    }
    dir
}

fn record(i: usize, content: &str) -> FileRecord {
    FileRecord {
        relative_path: format!("dir{}/{i}.txt", i % 100),
        size: content.len() as u64,
        modified_ns: i as i64,
        content_hash: hash_bytes(content.as_bytes()),
    }
}

fn snapshots() -> (Snapshot, Snapshot) {
    let previous = (0..SNAPSHOT_FILES)
        .map(|i| record(i, "original"))
        .collect();
    let current = (SNAPSHOT_FILES / 10..SNAPSHOT_FILES + SNAPSHOT_FILES / 10)
        .map(|i| record(i, if i % 7 == 0 { "edited" } else { "original" }))
        .collect();
    (previous, current)
}

fn bench_scan(c: &mut Criterion) {
    let tree = setup_tree();
    let cancel = CancelToken::new();
    for workers in [1, 8] {
        let scanner = Scanner::new(
            FilterPolicy::allow_all(),
            ScanOptions {
                max_workers: workers,
                ..ScanOptions::default()
            },
        );
        c.bench_with_input(BenchmarkId::new("scan", workers), &scanner, |b, scanner| {
            b.iter(|| scanner.scan(black_box(tree.path()), &cancel));
        });
    }
}

fn bench_diff(c: &mut Criterion) {
    let (previous, current) = snapshots();
    c.bench_function("diff_20k", |b| {
        b.iter(|| diff(black_box(&previous), black_box(&current)));
    });
}

criterion_group!(benches, bench_scan, bench_diff);
criterion_main!(benches);
