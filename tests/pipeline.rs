mod support;

use deltapack::archive;
use deltapack::cancel::CancelToken;
use deltapack::config::{self, PackerConfig};
use deltapack::packer::{PackageKind, PackageOutcome, Packer, PackerError};
use support::env::ConfigHomeGuard;
use support::tree::{remove_file, write_file};
use tempfile::tempdir;

fn package(packer: &mut Packer, kind: PackageKind, description: &str) -> PackageOutcome {
    let cancel = CancelToken::new();
    let report = packer.scan(&cancel, &mut |_, _| {});
    packer
        .package(&report, kind, description, &cancel, &mut |_, _| {})
        .expect("package")
}

fn entry_names(path: &std::path::Path) -> Vec<String> {
    archive::inspect(path)
        .expect("inspect archive")
        .entries
        .into_iter()
        .map(|entry| entry.name)
        .collect()
}

#[test]
fn default_config_home_drives_a_packaging_session() {
    let home = tempdir().unwrap();
    let work = tempdir().unwrap();
    let _guard = ConfigHomeGuard::set(home.path());

    let config_path = config::config_path().unwrap();
    assert!(config_path.starts_with(home.path()));
    assert_eq!(config::load_or_default().unwrap(), PackerConfig::default());

    let mut settings = PackerConfig {
        source_root: work.path().join("server"),
        output_root: work.path().join("packages"),
        ..PackerConfig::default()
    };
    settings.filters.target_paths = vec!["Mir200".into(), "DBServer/dbsrc.ini".into()];
    config::save_to_path(&settings, &config_path).unwrap();

    let source = work.path().join("server");
    write_file(&source, "Mir200/Envir/map.txt", b"map v1");
    write_file(&source, "Mir200/Log/today.txt", b"noise");
    write_file(&source, "Mir200/items.json", b"{}");
    write_file(&source, "DBServer/dbsrc.ini", b"[db]\nport=6000\n");
    write_file(&source, "DBServer/other.ini", b"ignored");
    write_file(&source, "readme.txt", b"outside targets");

    let mut packer = Packer::open(config::load_or_default().unwrap()).unwrap();
    let PackageOutcome::Completed {
        entry,
        archive_path,
        ..
    } = package(&mut packer, PackageKind::Incremental, "initial")
    else {
        panic!("first package was canceled");
    };
    assert_eq!(entry.tag.to_string(), "v1.0.0");
    assert_eq!(entry.description, "initial");
    assert_eq!(
        entry_names(&archive_path),
        vec!["DBServer/dbsrc.ini", "Mir200/Envir/map.txt"]
    );

    write_file(&source, "Mir200/Envir/map.txt", b"map v2");
    write_file(&source, "Mir200/Envir/npc.txt", b"npc");
    remove_file(&source, "DBServer/dbsrc.ini");
    drop(packer);

    let mut packer = Packer::open(config::load_or_default().unwrap()).unwrap();
    assert_eq!(
        packer.cached_text("Mir200/Envir/map.txt").as_deref(),
        Some("map v1")
    );
    let PackageOutcome::Completed {
        entry,
        archive_path,
        ..
    } = package(&mut packer, PackageKind::Incremental, "patch")
    else {
        panic!("second package was canceled");
    };
    assert_eq!(entry.tag.to_string(), "v1.1.0");
    assert_eq!(entry.file_count, 2);
    assert_eq!(
        entry_names(&archive_path),
        vec!["Mir200/Envir/map.txt", "Mir200/Envir/npc.txt"]
    );
    let bytes = archive::read_entry(&archive_path, "Mir200/Envir/map.txt").unwrap();
    assert_eq!(bytes, b"map v2");

    let cancel = CancelToken::new();
    let report = packer.scan(&cancel, &mut |_, _| {});
    assert!(report.changes.is_empty());
    let err = packer
        .package(&report, PackageKind::Incremental, "", &cancel, &mut |_, _| {})
        .unwrap_err();
    assert!(matches!(err, PackerError::NothingToPackage));

    let PackageOutcome::Completed { entry, .. } =
        package(&mut packer, PackageKind::Full, "rebase")
    else {
        panic!("full package was canceled");
    };
    assert_eq!(entry.tag.to_string(), "v2.0.0");
    let tags: Vec<String> = packer
        .history()
        .iter()
        .map(|entry| entry.tag.to_string())
        .collect();
    assert_eq!(tags, vec!["v2.0.0", "v1.1.0", "v1.0.0"]);
    for tag in &tags {
        assert!(work.path().join("packages").join(format!("{tag}.zip")).is_file());
    }
}
