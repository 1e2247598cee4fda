//! Ignore rules and the media allow-list.
//!
//! A path must survive the ignore rules *and* carry a supported media
//! extension before it is allowed to claim a pipeline worker.

use std::path::{Component, Path};

use shoebox_metadata::MediaKind;

/// Directory names whose contents are never ingested.
const IGNORED_DIR_NAMES: &[&str] = &[".hist", ".tmp", "temp", "tmp", "cache", "thumbnail", "thumb"];
/// File-name prefixes that mark scratch or system files.
const IGNORED_NAME_PREFIXES: &[&str] = &[".", "~", "Thumbs.db"];
/// Extensions used by in-progress downloads and scratch files.
const IGNORED_EXTENSIONS: &[&str] = &["tmp", "temp", "crdownload", "part", "lnk"];

/// Whether a directory name excludes its subtree from ingestion.
///
/// Hidden directories (dot-prefixed) are always excluded; this also keeps
/// the quarantine directory out of the pipeline.
#[must_use]
pub fn is_ignored_dir_name(name: &str) -> bool {
    name.starts_with('.') || IGNORED_DIR_NAMES.contains(&name.to_ascii_lowercase().as_str())
}

/// Whether a path is excluded by the ignore rules.
///
/// Checks the file name against prefix and extension rules, and the
/// directory components *below* `watch_root` against the
/// ignored-directory set. Ancestors of the watch root are the operator's
/// business; a staging tree parked under `/tmp` or a dot directory must
/// still ingest. Paths outside the root are checked in full.
#[must_use]
pub fn should_ignore(path: &Path, watch_root: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return true;
    };
    if IGNORED_NAME_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
    {
        return true;
    }
    if let Some(extension) = path.extension().and_then(|extension| extension.to_str()) {
        if IGNORED_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str()) {
            return true;
        }
    }
    let in_tree = path.strip_prefix(watch_root).unwrap_or(path);
    in_tree.parent().is_some_and(|parent| {
        parent.components().any(|component| match component {
            Component::Normal(part) => part.to_str().is_some_and(is_ignored_dir_name),
            _ => false,
        })
    })
}

/// Whether a path may enter the pipeline: not ignored and carrying a
/// supported media extension.
#[must_use]
pub fn is_ingestible(path: &Path, watch_root: &Path) -> bool {
    !should_ignore(path, watch_root) && MediaKind::from_path(path).is_some()
}
