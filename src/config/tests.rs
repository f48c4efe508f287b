use super::*;
use tempfile::tempdir;

#[test]
fn missing_file_yields_defaults() {
    let dir = tempdir().unwrap();
    let config = load_from(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
    assert_eq!(config, PackerConfig::default());
    assert_eq!(config.filters.exclude_folders, vec!["Log"]);
    assert_eq!(
        config.filters.exclude_extensions,
        vec![".log", ".zip", ".dll", ".exe", ".json"]
    );
    assert_eq!(config.scan.max_workers, 8);
    assert_eq!(config.scan.chunk_size, 8192);
    assert!(config.filters.target_paths.is_empty());
}

#[test]
fn partial_file_fills_in_defaults_and_resolves_roots() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        r#"
source_root = "game"
output_root = "/srv/packages"

[filters]
target_paths = ["Mir200", "DBServer/dbsrc.ini"]

[scan]
max_workers = 0
"#,
    )
    .unwrap();

    let config = load_from(&path).unwrap();
    assert_eq!(config.source_root, dir.path().join("game"));
    assert_eq!(config.output_root, std::path::Path::new("/srv/packages"));
    assert_eq!(config.cache_dir(), std::path::Path::new("/srv/packages/cache"));
    assert_eq!(config.filters.exclude_folders, vec!["Log"]);
    assert_eq!(config.scan.max_workers, 1);
    assert_eq!(config.scan.chunk_size, 8192);

    let policy = config.filter_policy();
    assert!(policy.included("Mir200/Envir/map.txt"));
    assert!(!policy.included("Mir200/Log/today.txt"));
    assert!(!policy.included("Mir200/data.json"));
    assert!(!policy.included("DBServer/other.ini"));
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "source_root = [").unwrap();
    let err = load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ParseToml { .. }));
    assert!(err.to_string().contains(CONFIG_FILE_NAME));
}

#[test]
fn saved_config_loads_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
    let mut config = PackerConfig {
        source_root: dir.path().join("src"),
        output_root: dir.path().join("out"),
        ..PackerConfig::default()
    };
    config.filters.target_paths = vec!["Mir200".into()];
    config.filters.exclude_files = vec!["Mir200/M2Server.map".into()];
    config.scan.max_workers = 3;

    save_to_path(&config, &path).unwrap();
    assert_eq!(load_from(&path).unwrap(), config);
    let siblings = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
    assert_eq!(siblings, 1);
}
