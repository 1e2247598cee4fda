//! Empty-directory pruning under the watch root.
//!
//! After a file leaves the staging tree its directory may be empty; this
//! module removes such directories bottom-up and then climbs toward the
//! watch root. Everything here is best effort: a directory that refuses to
//! go away is simply left behind. The watch root itself is never removed.

use std::fs;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::filter::is_ignored_dir_name;

/// Remove empty directories in the subtree rooted at `start_dir`, then walk
/// up its ancestors removing any that became empty, stopping at
/// `watch_root`.
pub fn prune_empty_dirs(start_dir: &Path, watch_root: &Path) {
    if !start_dir.starts_with(watch_root) {
        return;
    }

    // Deepest first so parents see their children gone.
    let mut directories: Vec<(usize, std::path::PathBuf)> = WalkDir::new(start_dir)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(is_ignored_dir_name))
        })
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| (entry.depth(), entry.into_path()))
        .collect();
    directories.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, directory) in directories {
        if fs::remove_dir(&directory).is_ok() {
            debug!(path = %directory.display(), "removed empty directory");
        }
    }

    // Climb from the start directory toward the watch root.
    for directory in start_dir.ancestors() {
        if directory == watch_root || !directory.starts_with(watch_root) {
            break;
        }
        if fs::remove_dir(directory).is_err() {
            // Still holds entries; nothing above it can be empty either.
            break;
        }
        debug!(path = %directory.display(), "removed empty directory");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn removes_empty_subtrees_and_ancestors() {
        let root = TempDir::new().expect("temp dir");
        let nested = root.path().join("2023/shoot/a/b");
        std::fs::create_dir_all(&nested).expect("create dirs");

        prune_empty_dirs(&root.path().join("2023/shoot"), root.path());

        assert!(!root.path().join("2023").exists());
        assert!(root.path().exists());
    }

    #[test]
    fn non_empty_directories_survive() {
        let root = TempDir::new().expect("temp dir");
        let shoot = root.path().join("2023/shoot");
        std::fs::create_dir_all(shoot.join("empty")).expect("create dirs");
        std::fs::write(shoot.join("keep.jpg"), b"payload").expect("write file");

        prune_empty_dirs(&shoot, root.path());

        assert!(shoot.exists());
        assert!(!shoot.join("empty").exists());
        assert!(shoot.join("keep.jpg").exists());
    }

    #[test]
    fn the_watch_root_is_never_removed() {
        let root = TempDir::new().expect("temp dir");
        prune_empty_dirs(root.path(), root.path());
        assert!(root.path().exists());
    }

    #[test]
    fn ignored_directories_are_left_alone() {
        let root = TempDir::new().expect("temp dir");
        let shoot = root.path().join("shoot");
        std::fs::create_dir_all(shoot.join(".hist")).expect("create dirs");

        prune_empty_dirs(&shoot, root.path());

        // The hidden directory is skipped, which also keeps `shoot` alive.
        assert!(shoot.join(".hist").exists());
    }

    #[test]
    fn paths_outside_the_watch_root_are_untouched() {
        let root = TempDir::new().expect("temp dir");
        let other = TempDir::new().expect("other dir");
        let stray = other.path().join("empty");
        std::fs::create_dir_all(&stray).expect("create dir");

        prune_empty_dirs(&stray, root.path());

        assert!(stray.exists());
    }
}
