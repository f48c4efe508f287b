use std::path::Path;

pub fn write_file(root: &Path, relative: &str, data: &[u8]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dirs");
    }
    std::fs::write(&path, data).expect("write test file");
}

pub fn remove_file(root: &Path, relative: &str) {
    std::fs::remove_file(root.join(relative)).expect("remove test file");
}
