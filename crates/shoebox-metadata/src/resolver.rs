//! Capture-time extraction strategies.
//!
//! # Design
//! - A small closed set of strategies selected by extension category, all
//!   exposing the identical `resolve(path) -> Option<timestamp>` contract.
//! - Missing tags, unsupported containers, and parse failures all degrade to
//!   `None`; the caller falls back to filesystem timestamps.

use std::path::Path;

use chrono::NaiveDateTime;
use nom_exif::{Exif, ExifIter, ExifTag, MediaParser, MediaSource, TrackInfo, TrackInfoTag};
use tracing::debug;

use crate::error::MetadataError;
use crate::kind::MediaKind;

/// EXIF date tags probed in priority order.
const EXIF_DATE_TAGS: &[ExifTag] = &[
    ExifTag::DateTimeOriginal,
    ExifTag::CreateDate,
    ExifTag::ModifyDate,
];

/// Strategy used to extract a capture timestamp from one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTimeResolver {
    /// EXIF embedded in a standard image container.
    ExifImage,
    /// EXIF embedded in a TIFF-based RAW container.
    RawImage,
    /// Creation time recorded in a video container's track metadata.
    VideoContainer,
    /// No embedded metadata; the caller uses filesystem timestamps.
    FileTimes,
}

impl CaptureTimeResolver {
    /// Select the strategy for a path based on its extension category.
    #[must_use]
    pub fn for_path(path: &Path) -> Self {
        match MediaKind::from_path(path) {
            Some(MediaKind::Image) => Self::ExifImage,
            Some(MediaKind::Raw) => Self::RawImage,
            Some(MediaKind::Video) => Self::VideoContainer,
            None => Self::FileTimes,
        }
    }

    /// Extract the capture timestamp, degrading to `None` on any failure.
    #[must_use]
    pub fn resolve(self, path: &Path) -> Option<NaiveDateTime> {
        let result = match self {
            Self::ExifImage | Self::RawImage => read_exif_capture_time(path),
            Self::VideoContainer => read_video_capture_time(path),
            Self::FileTimes => return None,
        };

        match result {
            Ok(timestamp) => timestamp,
            Err(error) => {
                debug!(path = %path.display(), error = %error, "capture time extraction failed");
                None
            }
        }
    }
}

/// Resolve the capture timestamp for a path using the strategy matching its
/// extension category.
#[must_use]
pub fn resolve_capture_time(path: &Path) -> Option<NaiveDateTime> {
    CaptureTimeResolver::for_path(path).resolve(path)
}

fn read_exif_capture_time(path: &Path) -> Result<Option<NaiveDateTime>, MetadataError> {
    let source = open_source(path)?;
    if !source.has_exif() {
        return Ok(None);
    }

    let mut parser = MediaParser::new();
    let iter: ExifIter = parser
        .parse(source)
        .map_err(|source_err| MetadataError::Parse {
            path: path.to_path_buf(),
            source: source_err,
        })?;
    let exif: Exif = iter.into();

    for tag in EXIF_DATE_TAGS {
        if let Some(value) = exif.get(*tag)
            && let Some((time, _offset)) = value.as_time_components()
        {
            return Ok(Some(time));
        }
    }
    Ok(None)
}

fn read_video_capture_time(path: &Path) -> Result<Option<NaiveDateTime>, MetadataError> {
    let source = open_source(path)?;
    if !source.has_track() {
        return Ok(None);
    }

    let mut parser = MediaParser::new();
    let info: TrackInfo = parser
        .parse(source)
        .map_err(|source_err| MetadataError::Parse {
            path: path.to_path_buf(),
            source: source_err,
        })?;

    Ok(info
        .get(TrackInfoTag::CreateDate)
        .and_then(nom_exif::EntryValue::as_time_components)
        .map(|(time, _offset)| time))
}

fn open_source(path: &Path) -> Result<MediaSource<std::fs::File>, MetadataError> {
    MediaSource::file_path(path).map_err(|source_err| MetadataError::Parse {
        path: path.to_path_buf(),
        source: source_err,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn strategy_selection_follows_extension_category() {
        assert_eq!(
            CaptureTimeResolver::for_path(Path::new("a.jpg")),
            CaptureTimeResolver::ExifImage
        );
        assert_eq!(
            CaptureTimeResolver::for_path(Path::new("a.nef")),
            CaptureTimeResolver::RawImage
        );
        assert_eq!(
            CaptureTimeResolver::for_path(Path::new("a.mov")),
            CaptureTimeResolver::VideoContainer
        );
        assert_eq!(
            CaptureTimeResolver::for_path(Path::new("a.txt")),
            CaptureTimeResolver::FileTimes
        );
    }

    #[test]
    fn unreadable_file_degrades_to_none() {
        let resolver = CaptureTimeResolver::for_path(Path::new("missing.jpg"));
        assert_eq!(resolver.resolve(Path::new("/does/not/exist.jpg")), None);
    }

    #[test]
    fn garbage_payload_degrades_to_none() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("garbage.jpg");
        fs::write(&path, b"not actually a jpeg").expect("write garbage");
        assert_eq!(resolve_capture_time(&path), None);
    }

    #[test]
    fn file_times_strategy_never_probes_the_file() {
        assert_eq!(
            CaptureTimeResolver::FileTimes.resolve(Path::new("/does/not/exist.bin")),
            None
        );
    }
}
