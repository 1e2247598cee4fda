//! Extension categories for supported media types.
//!
//! The category decides which extraction strategy runs and doubles as the
//! pipeline's allow-list: a path with no category is not a media file.

use std::path::Path;

/// Image formats carrying EXIF in a standard container.
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "heic", "heif", "gif", "bmp", "tiff",
];
/// Camera RAW formats (TIFF-based containers).
const RAW_EXTENSIONS: &[&str] = &[
    "cr2", "cr3", "nef", "arw", "raf", "orf", "rw2", "dng", "sr2",
];
/// Video container formats.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "mts", "m2ts"];

/// Category of a supported media file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Standard image container (JPEG, HEIC, PNG, ...).
    Image,
    /// Camera RAW container.
    Raw,
    /// Video container.
    Video,
}

impl MediaKind {
    /// Classify a path by its extension, case-insensitively.
    ///
    /// Returns `None` for paths without an extension or with an extension
    /// outside the supported media set.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            Some(Self::Image)
        } else if RAW_EXTENSIONS.contains(&extension.as_str()) {
            Some(Self::Raw)
        } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            Some(Self::Video)
        } else {
            None
        }
    }
}
