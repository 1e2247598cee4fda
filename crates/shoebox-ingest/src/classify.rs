//! Destination bucket resolution and collision-free naming.
//!
//! Capture time comes from embedded metadata when the resolver found one;
//! otherwise the earlier of the filesystem modification and change times
//! stands in, and as a last resort the current wall clock. The bucket is
//! always resolvable.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDateTime};

use crate::model::DestinationBucket;

/// Upper bound on numbered collision candidates before falling back to a
/// unix-timestamp suffix.
const COLLISION_COUNTER_CAP: u32 = 100;

/// Resolve the archive bucket for a file.
#[must_use]
pub fn resolve_destination_bucket(
    path: &Path,
    capture_time: Option<NaiveDateTime>,
) -> DestinationBucket {
    let timestamp = capture_time
        .or_else(|| filesystem_timestamp(path))
        .unwrap_or_else(|| Local::now().naive_local());
    DestinationBucket::from_datetime(timestamp)
}

/// Earlier of the modification and change times, in local wall time.
fn filesystem_timestamp(path: &Path) -> Option<NaiveDateTime> {
    let metadata = fs::metadata(path).ok()?;
    let modified = metadata.modified().ok().map(local_from_system_time);
    let changed = change_time(&metadata);
    match (modified, changed) {
        (Some(modified), Some(changed)) => Some(modified.min(changed)),
        (modified, changed) => modified.or(changed),
    }
}

#[cfg(unix)]
fn change_time(metadata: &fs::Metadata) -> Option<NaiveDateTime> {
    use std::os::unix::fs::MetadataExt;
    local_from_unix_secs(metadata.ctime())
}

#[cfg(not(unix))]
fn change_time(_metadata: &fs::Metadata) -> Option<NaiveDateTime> {
    None
}

fn local_from_system_time(time: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local()
}

#[cfg(unix)]
fn local_from_unix_secs(secs: i64) -> Option<NaiveDateTime> {
    use chrono::TimeZone;

    Local
        .timestamp_opt(secs, 0)
        .single()
        .map(|timestamp| timestamp.naive_local())
}

/// Pick a destination path inside `directory` that does not collide with an
/// existing entry.
///
/// The original name is preferred; on collision a `_YYYYMMDD_HHMMSS` tag is
/// appended, then a numeric counter, and finally a unix-timestamp suffix.
#[must_use]
pub fn unique_destination(directory: &Path, file_name: &str) -> PathBuf {
    let primary = directory.join(file_name);
    if !primary.exists() {
        return primary;
    }

    let (stem, suffix) = split_name(file_name);
    let tag = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let tagged = directory.join(format!("{stem}_{tag}{suffix}"));
    if !tagged.exists() {
        return tagged;
    }
    for counter in 1..=COLLISION_COUNTER_CAP {
        let candidate = directory.join(format!("{stem}_{tag}_{counter}{suffix}"));
        if !candidate.exists() {
            return candidate;
        }
    }
    directory.join(format!("{stem}_{}{suffix}", Local::now().timestamp()))
}

/// Split a file name into stem and dot-prefixed suffix.
pub(crate) fn split_name(file_name: &str) -> (&str, String) {
    match file_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem, format!(".{extension}")),
        _ => (file_name, String::new()),
    }
}
