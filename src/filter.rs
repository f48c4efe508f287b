//! Path inclusion rules applied while scanning a source root.

use std::collections::HashSet;

/// Inclusion policy built from configured target subtrees and exclude sets.
///
/// All paths are compared in their normalized form: `/` separators, no leading
/// `./` or `/`. Extensions are stored lower-case with a leading dot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPolicy {
    targets: Vec<String>,
    exclude_files: HashSet<String>,
    exclude_folders: HashSet<String>,
    exclude_extensions: Vec<String>,
    excluded_subtrees: Vec<String>,
}

impl FilterPolicy {
    /// Build a policy from raw configuration values.
    ///
    /// An empty target list selects the whole root.
    pub fn new<T, F, D, E>(
        targets: T,
        exclude_files: F,
        exclude_folders: D,
        exclude_extensions: E,
    ) -> Self
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        F: IntoIterator,
        F::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let mut normalized_targets: Vec<String> = Vec::new();
        for target in targets {
            let target = normalize_relative(target.as_ref());
            if target.is_empty() {
                // An empty target names the root itself.
                normalized_targets.clear();
                break;
            }
            if !normalized_targets.contains(&target) {
                normalized_targets.push(target);
            }
        }
        Self {
            targets: normalized_targets,
            exclude_files: exclude_files
                .into_iter()
                .map(|path| normalize_relative(path.as_ref()))
                .filter(|path| !path.is_empty())
                .collect(),
            exclude_folders: exclude_folders
                .into_iter()
                .map(|name| name.as_ref().trim_matches(['/', '\\']).to_string())
                .filter(|name| !name.is_empty())
                .collect(),
            exclude_extensions: exclude_extensions
                .into_iter()
                .filter_map(|ext| normalize_extension(ext.as_ref()))
                .collect(),
            excluded_subtrees: Vec::new(),
        }
    }

    /// Also exclude everything at or below `relative_dir`.
    ///
    /// Used to keep the packer's own output out of its scans when the output
    /// root lives inside the source root. An empty path is ignored.
    pub fn with_excluded_subtree(mut self, relative_dir: &str) -> Self {
        let subtree = normalize_relative(relative_dir);
        if !subtree.is_empty() && !self.excluded_subtrees.contains(&subtree) {
            self.excluded_subtrees.push(subtree);
        }
        self
    }

    /// Policy that accepts every file under the root.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Normalized target subtrees; empty means the whole root.
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Decide whether `relative_path` belongs in a snapshot.
    ///
    /// Checks run extension, explicit file, folder segment, in that order; the
    /// first match excludes. Paths outside every target are never included.
    pub fn included(&self, relative_path: &str) -> bool {
        let path = normalize_relative(relative_path);
        if path.is_empty() {
            return false;
        }
        if self.excluded_by_extension(&path) {
            return false;
        }
        if self.exclude_files.contains(&path) {
            return false;
        }
        if self.excluded_by_folder(&path) {
            return false;
        }
        if self.excludes_subtree(&path) {
            return false;
        }
        self.within_targets(&path)
    }

    /// Whether a directory with this name must not be descended into.
    pub fn excludes_folder(&self, name: &str) -> bool {
        self.exclude_folders.contains(name)
    }

    /// Whether `relative_path` lies in a subtree added by
    /// [`FilterPolicy::with_excluded_subtree`].
    pub fn excludes_subtree(&self, relative_path: &str) -> bool {
        let path = normalize_relative(relative_path);
        self.excluded_subtrees
            .iter()
            .any(|subtree| is_within(&path, subtree))
    }

    fn excluded_by_extension(&self, path: &str) -> bool {
        let file_name = path.rsplit('/').next().unwrap_or(path).to_lowercase();
        self.exclude_extensions
            .iter()
            .any(|ext| file_name.ends_with(ext.as_str()))
    }

    fn excluded_by_folder(&self, path: &str) -> bool {
        let mut segments: Vec<&str> = path.split('/').collect();
        segments.pop();
        segments
            .into_iter()
            .any(|segment| self.exclude_folders.contains(segment))
    }

    fn within_targets(&self, path: &str) -> bool {
        if self.targets.is_empty() {
            return true;
        }
        self.targets.iter().any(|target| is_within(path, target))
    }
}

fn is_within(path: &str, dir: &str) -> bool {
    path == dir
        || path
            .strip_prefix(dir)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Normalize a configured or scanned relative path to `a/b/c` form.
pub fn normalize_relative(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim().to_lowercase();
    if ext.is_empty() || ext == "." {
        return None;
    }
    if ext.starts_with('.') {
        Some(ext)
    } else {
        Some(format!(".{ext}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> FilterPolicy {
        FilterPolicy::new(
            ["Mir200", "DBServer/dbsrc.ini"],
            ["Mir200\\M2Server.map"],
            ["Log"],
            [".log", "EXE", ".json"],
        )
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let policy = policy();
        assert!(!policy.included("Mir200/tool.exe"));
        assert!(!policy.included("Mir200/TOOL.EXE"));
        assert!(!policy.included("Mir200/data.Json"));
        assert!(policy.included("Mir200/readme.txt"));
    }

    #[test]
    fn explicit_files_are_matched_after_normalization() {
        let policy = policy();
        assert!(!policy.included("Mir200/M2Server.map"));
        assert!(!policy.included("./Mir200\\M2Server.map"));
        assert!(policy.included("Mir200/Other.map"));
    }

    #[test]
    fn folder_segment_excludes_anywhere_in_path() {
        let policy = policy();
        assert!(!policy.included("Mir200/Log/today.txt"));
        assert!(!policy.included("Mir200/a/Log/b/deep.txt"));
        assert!(policy.included("Mir200/Logs/today.txt"));
        assert!(policy.included("Mir200/Log"));
        assert!(policy.excludes_folder("Log"));
        assert!(!policy.excludes_folder("log"));
    }

    #[test]
    fn paths_outside_targets_are_rejected() {
        let policy = policy();
        assert!(policy.included("DBServer/dbsrc.ini"));
        assert!(!policy.included("DBServer/other.ini"));
        assert!(!policy.included("Mir2000/file.txt"));
        assert!(!policy.included("root.txt"));
    }

    #[test]
    fn empty_targets_select_whole_tree() {
        let policy = FilterPolicy::new(
            Vec::<String>::new(),
            Vec::<String>::new(),
            ["Log"],
            [".exe"],
        );
        assert!(policy.targets().is_empty());
        assert!(policy.included("a.txt"));
        assert!(policy.included("sub/b.py"));
        assert!(!policy.included("c.exe"));
        assert!(!policy.included("Log/x.txt"));
    }

    #[test]
    fn root_target_collapses_to_whole_tree() {
        let policy = FilterPolicy::new(
            [".", "sub"],
            Vec::<String>::new(),
            Vec::<String>::new(),
            Vec::<String>::new(),
        );
        assert!(policy.targets().is_empty());
        assert!(policy.included("anything.bin"));
    }

    #[test]
    fn excluded_subtree_hides_everything_below_it() {
        let policy = FilterPolicy::allow_all().with_excluded_subtree("./output/");
        assert!(!policy.included("output/v1.0.0.zip.partial"));
        assert!(!policy.included("output/cache/blobs/ab/cd/x.blob"));
        assert!(policy.excludes_subtree("output"));
        assert!(policy.included("outputs/keep.txt"));
        assert!(policy.included("src/output/keep.txt"));
        assert_eq!(
            FilterPolicy::allow_all().with_excluded_subtree("."),
            FilterPolicy::allow_all()
        );
    }

    #[test]
    fn normalize_relative_handles_mixed_separators() {
        assert_eq!(normalize_relative("./a\\b//c/"), "a/b/c");
        assert_eq!(normalize_relative("/a"), "a");
        assert_eq!(normalize_relative("."), "");
    }
}
