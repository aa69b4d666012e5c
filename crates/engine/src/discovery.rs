//! Bounded project-tree discovery.
//!
//! Walks a validated root breadth-limited by depth and file count, filters
//! leaves by extension, and mints every discovered file as a
//! [`ValidatedPath`] via [`ValidatedPath::join_under`], so downstream code
//! never re-checks containment.
//!
//! The walk is deterministic: directory entries are visited in file-name
//! order, so the same tree always yields the same file list.

use offload_security::ValidatedPath;
use std::path::Path;
use walkdir::WalkDir;

pub const DEFAULT_MAX_DEPTH: usize = 5;
pub const DEFAULT_MAX_FILES: usize = 500;
/// 1 MiB. Larger files are almost never single analysis units.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Extensions discovered when the caller does not narrow the set.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "py", "rs", "go", "java", "c", "h", "cpp", "hpp", "cs",
    "rb", "php", "swift", "kt", "md", "json", "yaml", "yml", "toml",
];

/// Directories that are never worth descending into.
const SKIPPED_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    "coverage",
    "vendor",
    "venv",
    "__pycache__",
];

#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Lowercase extensions without the dot. Empty means accept everything.
    pub extensions: Vec<String>,
    pub max_depth: usize,
    pub max_files: usize,
    pub max_file_size: u64,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_files: DEFAULT_MAX_FILES,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveredFiles {
    /// In walk order (deterministic), each proven under the root.
    pub files: Vec<ValidatedPath>,
    /// True when `max_files` stopped the walk before it finished.
    pub truncated: bool,
}

/// Walk `root` and collect analyzable files, bounded by `options`.
///
/// Unreadable entries are skipped, never fatal. Symlinks are followed, but
/// a directory is descended into at most once (tracked by device/inode), so
/// link cycles and duplicate subtrees cannot blow up the walk.
pub fn discover(root: &ValidatedPath, options: &DiscoveryOptions) -> DiscoveredFiles {
    let mut files = Vec::new();
    let mut truncated = false;
    #[cfg(unix)]
    let mut visited_dirs = std::collections::HashSet::new();

    let walker = WalkDir::new(root.as_path())
        .max_depth(options.max_depth)
        .follow_links(true)
        .sort_by_file_name();

    let mut entries = walker.into_iter();
    while let Some(entry) = entries.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::debug!("skipping unreadable entry: {err}");
                continue;
            }
        };

        if entry.file_type().is_dir() {
            if entry.depth() > 0 && is_skipped_dir(entry.file_name().to_str()) {
                entries.skip_current_dir();
                continue;
            }
            #[cfg(unix)]
            if let Ok(meta) = entry.metadata() {
                use std::os::unix::fs::MetadataExt;
                if !visited_dirs.insert((meta.dev(), meta.ino())) {
                    // Already walked via another link.
                    entries.skip_current_dir();
                }
            }
            continue;
        }

        if !entry.file_type().is_file() {
            continue;
        }
        if !has_allowed_extension(entry.path(), &options.extensions) {
            continue;
        }
        match entry.metadata() {
            Ok(meta) if meta.len() > options.max_file_size => {
                log::debug!(
                    "skipping oversized file: {} ({} bytes)",
                    entry.path().display(),
                    meta.len()
                );
                continue;
            }
            Err(err) => {
                log::debug!("skipping {}: {err}", entry.path().display());
                continue;
            }
            Ok(_) => {}
        }

        let Ok(relative) = entry.path().strip_prefix(root.as_path()) else {
            continue;
        };
        match root.join_under(relative) {
            Ok(path) => files.push(path),
            Err(err) => {
                log::warn!("walk produced an escaping path, skipping: {err}");
                continue;
            }
        }

        if files.len() >= options.max_files {
            // More entries may have remained; report the cut.
            truncated = entries.next().is_some();
            break;
        }
    }

    DiscoveredFiles { files, truncated }
}

fn is_skipped_dir(name: Option<&str>) -> bool {
    let Some(name) = name else {
        return true;
    };
    name.starts_with('.') || SKIPPED_DIRS.contains(&name)
}

fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use offload_security::AllowedRoots;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::PathBuf;

    fn validated_root(dir: &Path) -> ValidatedPath {
        let canonical = dir.canonicalize().unwrap();
        AllowedRoots::new([canonical.clone()])
            .unwrap()
            .validate(&canonical)
            .unwrap()
    }

    fn relative_names(root: &ValidatedPath, discovered: &DiscoveredFiles) -> Vec<String> {
        discovered
            .files
            .iter()
            .map(|f| {
                f.strip_prefix(root.as_path())
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }

    fn touch(path: PathBuf, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn walks_in_name_order_and_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path().join("b.rs"), "fn b() {}");
        touch(dir.path().join("a.rs"), "fn a() {}");
        touch(dir.path().join("notes.txt"), "not source");
        touch(dir.path().join("sub/c.py"), "pass");

        let root = validated_root(dir.path());
        let found = discover(&root, &DiscoveryOptions::default());

        assert_eq!(relative_names(&root, &found), ["a.rs", "b.rs", "sub/c.py"]);
        assert!(!found.truncated);
    }

    #[test]
    fn denylisted_and_hidden_directories_are_pruned() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path().join("keep.rs"), "fn k() {}");
        touch(dir.path().join("node_modules/lib/index.js"), "x");
        touch(dir.path().join(".git/config.json"), "{}");

        let root = validated_root(dir.path());
        let found = discover(&root, &DiscoveryOptions::default());

        assert_eq!(relative_names(&root, &found), ["keep.rs"]);
    }

    #[test]
    fn max_files_truncates_and_flags() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            touch(dir.path().join(format!("f{i}.rs")), "x");
        }

        let root = validated_root(dir.path());
        let options = DiscoveryOptions {
            max_files: 3,
            ..DiscoveryOptions::default()
        };
        let found = discover(&root, &options);

        assert_eq!(relative_names(&root, &found), ["f0.rs", "f1.rs", "f2.rs"]);
        assert!(found.truncated);
    }

    #[test]
    fn max_depth_cuts_deep_subtrees() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path().join("top.rs"), "x");
        touch(dir.path().join("a/mid.rs"), "x");
        touch(dir.path().join("a/b/deep.rs"), "x");

        let root = validated_root(dir.path());
        let options = DiscoveryOptions {
            max_depth: 2,
            ..DiscoveryOptions::default()
        };
        let found = discover(&root, &options);

        assert_eq!(relative_names(&root, &found), ["a/mid.rs", "top.rs"]);
    }

    #[test]
    fn oversized_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path().join("small.rs"), "fn s() {}");
        touch(dir.path().join("big.rs"), &"x".repeat(2048));

        let root = validated_root(dir.path());
        let options = DiscoveryOptions {
            max_file_size: 1024,
            ..DiscoveryOptions::default()
        };
        let found = discover(&root, &options);

        assert_eq!(relative_names(&root, &found), ["small.rs"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycles_do_not_duplicate_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path().join("sub/a.rs"), "fn a() {}");
        std::os::unix::fs::symlink(dir.path().join("sub"), dir.path().join("zlink")).unwrap();
        // Link back up into the tree: without cycle detection this walk
        // would revisit `sub` forever (or until max_depth).
        std::os::unix::fs::symlink(dir.path(), dir.path().join("sub/loop")).unwrap();

        let root = validated_root(dir.path());
        let found = discover(&root, &DiscoveryOptions::default());

        let names = relative_names(&root, &found);
        let count = names.iter().filter(|n| n.ends_with("a.rs")).count();
        assert_eq!(count, 1, "each real file appears exactly once: {names:?}");
    }

    #[test]
    fn empty_extension_list_accepts_everything() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path().join("data.bin"), "x");

        let root = validated_root(dir.path());
        let options = DiscoveryOptions {
            extensions: Vec::new(),
            ..DiscoveryOptions::default()
        };
        let found = discover(&root, &options);

        assert_eq!(found.files.len(), 1);
    }
}
