//! Atomic relocation with retries, fallback, and quarantine.
//!
//! # Design
//! - The file is streamed to a temporary name inside the destination
//!   directory, then renamed into place. The temp and the final path share
//!   a filesystem, so the rename is atomic and a crash leaves either the
//!   source or a discarded temp, never a half-written archive file.
//! - Copy, rename, and source deletion each run under the shared retry
//!   policy. A source that cannot be deleted after a successful move is
//!   shunted into the quarantine directory so it is not re-ingested.
//! - All heavy I/O happens on the blocking pool.

use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use shoebox_config::{IngestSettings, RetrySettings};
use shoebox_telemetry::Metrics;
use tracing::{debug, info, warn};

use crate::classify::split_name;
use crate::error::{IngestError, IngestResult};
use crate::retry::with_retries;
use crate::shutdown::StopFlag;

/// Directory under the watch root holding sources that survived a move but
/// could not be deleted.
pub const QUARANTINE_DIR_NAME: &str = "._failed_locked";

/// Result of a successful relocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveResult {
    /// Destination written and source removed.
    Moved,
    /// Destination written; the source could not be deleted and was moved
    /// into quarantine instead.
    MovedSourceQuarantined {
        /// Where the stuck source now lives.
        quarantine_path: PathBuf,
    },
}

/// Relocates files into the archive tree.
pub struct AtomicMover {
    retry: RetrySettings,
    copy_buffer_bytes: usize,
    dry_run: bool,
    quarantine_dir: PathBuf,
    metrics: Metrics,
    stop: StopFlag,
}

impl AtomicMover {
    /// Build a mover from pipeline settings.
    #[must_use]
    pub fn new(settings: &IngestSettings, metrics: Metrics, stop: StopFlag) -> Self {
        Self {
            retry: settings.retry,
            copy_buffer_bytes: settings.copy_buffer_bytes,
            dry_run: settings.dry_run,
            quarantine_dir: settings.watch_root.join(QUARANTINE_DIR_NAME),
            metrics,
            stop,
        }
    }

    /// Move `source` to `destination` via a same-directory temp file.
    ///
    /// # Errors
    ///
    /// Returns an error when the destination directory cannot be created or
    /// when the copy or rename fails past the retry ceiling. A failed
    /// source deletion is not an error; the source is quarantined instead.
    pub async fn move_file(&self, source: &Path, destination: &Path) -> IngestResult<MoveResult> {
        if self.dry_run {
            info!(
                source = %source.display(),
                destination = %destination.display(),
                "dry-run: would move file"
            );
            return Ok(MoveResult::Moved);
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|err| IngestError::Io {
                operation: "create_destination_dir",
                path: parent.to_path_buf(),
                source: err,
            })?;
        }
        remove_stale_temps(destination);

        let temp = temp_destination(destination);
        let copied = with_retries(
            &self.retry,
            "copy",
            source,
            &self.metrics,
            &self.stop,
            || {
                let source = source.to_path_buf();
                let temp = temp.clone();
                let buffer_bytes = self.copy_buffer_bytes;
                async move {
                    tokio::task::spawn_blocking(move || {
                        copy_streaming(&source, &temp, buffer_bytes)
                    })
                    .await
                    .map_err(io::Error::other)?
                }
            },
        )
        .await;
        if let Err(err) = copied {
            discard_temp(&temp);
            return Err(err);
        }

        let renamed = with_retries(
            &self.retry,
            "rename",
            destination,
            &self.metrics,
            &self.stop,
            || async { fs::rename(&temp, destination) },
        )
        .await;
        if let Err(err) = renamed {
            discard_temp(&temp);
            return Err(err);
        }

        let deleted = with_retries(
            &self.retry,
            "delete_source",
            source,
            &self.metrics,
            &self.stop,
            || async { fs::remove_file(source) },
        )
        .await;
        match deleted {
            Ok(()) => {
                debug!(
                    source = %source.display(),
                    destination = %destination.display(),
                    "file moved"
                );
                Ok(MoveResult::Moved)
            }
            Err(err) => {
                warn!(
                    source = %source.display(),
                    error = %err,
                    "source survived the move and could not be deleted"
                );
                Ok(self.quarantine(source))
            }
        }
    }

    /// Plain streamed copy directly to the destination, used when the
    /// atomic protocol fails. Source deletion is best effort.
    ///
    /// # Errors
    ///
    /// Returns an error when the copy itself fails past the retry ceiling.
    pub async fn copy_in_place(&self, source: &Path, destination: &Path) -> IngestResult<()> {
        if self.dry_run {
            info!(
                source = %source.display(),
                destination = %destination.display(),
                "dry-run: would copy file"
            );
            return Ok(());
        }

        with_retries(
            &self.retry,
            "fallback_copy",
            source,
            &self.metrics,
            &self.stop,
            || {
                let source = source.to_path_buf();
                let destination = destination.to_path_buf();
                let buffer_bytes = self.copy_buffer_bytes;
                async move {
                    tokio::task::spawn_blocking(move || {
                        copy_streaming(&source, &destination, buffer_bytes)
                    })
                    .await
                    .map_err(io::Error::other)?
                }
            },
        )
        .await?;

        if let Err(err) = fs::remove_file(source) {
            warn!(
                source = %source.display(),
                error = %err,
                "fallback copy succeeded but the source could not be deleted"
            );
        }
        Ok(())
    }

    /// Move a stuck source into the quarantine directory. Every failure
    /// here degrades to leaving the source in place.
    fn quarantine(&self, source: &Path) -> MoveResult {
        if let Err(err) = fs::create_dir_all(&self.quarantine_dir) {
            warn!(
                quarantine = %self.quarantine_dir.display(),
                error = %err,
                "quarantine directory could not be created; leaving source in place"
            );
            return MoveResult::Moved;
        }
        let target = self.quarantine_dir.join(quarantine_name(source));
        match fs::rename(source, &target) {
            Ok(()) => {
                self.metrics.inc_quarantined();
                warn!(
                    source = %source.display(),
                    quarantine = %target.display(),
                    "source quarantined"
                );
                MoveResult::MovedSourceQuarantined {
                    quarantine_path: target,
                }
            }
            Err(err) => {
                warn!(
                    source = %source.display(),
                    error = %err,
                    "source could not be quarantined; leaving it in place"
                );
                MoveResult::Moved
            }
        }
    }
}

/// Temp name beside the destination: `<stem>.<pid>.<millis>.tmp<suffix>`.
fn temp_destination(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or("incoming");
    let (stem, suffix) = split_name(name);
    let pid = std::process::id();
    let millis = Local::now().timestamp_millis();
    destination.with_file_name(format!("{stem}.{pid}.{millis}.tmp{suffix}"))
}

/// Quarantine name: `<stem>_locked_<unix-seconds><suffix>`.
fn quarantine_name(source: &Path) -> String {
    let name = source
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or("unnamed");
    let (stem, suffix) = split_name(name);
    format!("{stem}_locked_{}{suffix}", Local::now().timestamp())
}

/// Remove leftover temp files from crashed runs targeting the same name.
///
/// Only names of the exact `<stem>.<pid>.<millis>.tmp<suffix>` shape are
/// swept, and temps carrying this process's pid are left alone: they belong
/// to a concurrent worker, and an archived file whose name merely contains
/// `.tmp` is not a temp at all.
fn remove_stale_temps(destination: &Path) {
    let Some(parent) = destination.parent() else {
        return;
    };
    let Some(name) = destination.file_name().and_then(OsStr::to_str) else {
        return;
    };
    let (stem, suffix) = split_name(name);
    let Ok(entries) = fs::read_dir(parent) else {
        return;
    };
    for entry in entries.flatten() {
        let entry_name = entry.file_name();
        let Some(entry_name) = entry_name.to_str() else {
            continue;
        };
        if let Some(pid) = parse_temp_pid(entry_name, stem, &suffix)
            && pid != std::process::id()
        {
            debug!(path = %entry.path().display(), "removing stale temp file");
            let _ = fs::remove_file(entry.path());
        }
    }
}

/// Parse a `<stem>.<pid>.<millis>.tmp<suffix>` temp name, returning the
/// embedded pid. Anything that does not match the shape exactly is not a
/// temp file.
fn parse_temp_pid(entry_name: &str, stem: &str, suffix: &str) -> Option<u32> {
    let rest = entry_name.strip_prefix(stem)?.strip_prefix('.')?;
    let rest = rest.strip_suffix(suffix)?;
    let rest = rest.strip_suffix(".tmp")?;
    let (pid, millis) = rest.split_once('.')?;
    if millis.is_empty() || !millis.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    pid.parse::<u32>().ok()
}

fn discard_temp(temp: &Path) {
    let _ = fs::remove_file(temp);
}

/// Stream `source` into `destination`, preserving permissions and the
/// modification time, and fsync before returning.
fn copy_streaming(source: &Path, destination: &Path, buffer_bytes: usize) -> io::Result<()> {
    let mut reader = File::open(source)?;
    let metadata = reader.metadata()?;
    let mut writer = File::create(destination)?;
    let mut buffer = vec![0_u8; buffer_bytes.max(1)];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        writer.write_all(&buffer[..read])?;
    }
    writer.set_permissions(metadata.permissions())?;
    if let Ok(modified) = metadata.modified() {
        writer.set_modified(modified)?;
    }
    writer.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn mover_for(watch_root: &Path, dry_run: bool) -> AtomicMover {
        let mut settings = IngestSettings::new(watch_root.to_path_buf(), PathBuf::from("/archive"));
        settings.dry_run = dry_run;
        settings.copy_buffer_bytes = 4096;
        AtomicMover::new(&settings, Metrics::new().expect("metrics"), StopFlag::new())
    }

    #[tokio::test]
    async fn moves_a_file_and_removes_the_source() {
        let staging = TempDir::new().expect("staging dir");
        let archive = TempDir::new().expect("archive dir");
        let source = staging.path().join("photo.jpg");
        std::fs::write(&source, b"image bytes").expect("write source");

        let destination = archive.path().join("2023/07/04/photo.jpg");
        let mover = mover_for(staging.path(), false);
        let result = mover
            .move_file(&source, &destination)
            .await
            .expect("move succeeds");

        assert_eq!(result, MoveResult::Moved);
        assert!(!source.exists());
        assert_eq!(
            std::fs::read(&destination).expect("read destination"),
            b"image bytes"
        );
    }

    #[tokio::test]
    async fn dry_run_touches_nothing() {
        let staging = TempDir::new().expect("staging dir");
        let archive = TempDir::new().expect("archive dir");
        let source = staging.path().join("photo.jpg");
        std::fs::write(&source, b"image bytes").expect("write source");

        let destination = archive.path().join("2023/07/04/photo.jpg");
        let mover = mover_for(staging.path(), true);
        let result = mover
            .move_file(&source, &destination)
            .await
            .expect("dry-run move succeeds");

        assert_eq!(result, MoveResult::Moved);
        assert!(source.exists());
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn stale_temps_are_cleared_before_the_copy() {
        let staging = TempDir::new().expect("staging dir");
        let archive = TempDir::new().expect("archive dir");
        let source = staging.path().join("photo.jpg");
        std::fs::write(&source, b"image bytes").expect("write source");

        let day_dir = archive.path().join("2023/07/04");
        std::fs::create_dir_all(&day_dir).expect("create day dir");
        // A pid no live process can hold, so the temp reads as a dead run's.
        let stale = day_dir.join("photo.4294967295.1234567.tmp.jpg");
        std::fs::write(&stale, b"half written").expect("write stale temp");

        let destination = day_dir.join("photo.jpg");
        let mover = mover_for(staging.path(), false);
        mover
            .move_file(&source, &destination)
            .await
            .expect("move succeeds");

        assert!(!stale.exists());
        assert!(destination.exists());
    }

    #[tokio::test]
    async fn archived_files_containing_tmp_in_their_name_survive_the_sweep() {
        let staging = TempDir::new().expect("staging dir");
        let archive = TempDir::new().expect("archive dir");
        let source = staging.path().join("photo.jpg");
        std::fs::write(&source, b"new shot").expect("write source");

        let day_dir = archive.path().join("2023/07/04");
        std::fs::create_dir_all(&day_dir).expect("create day dir");
        let archived = day_dir.join("photo.tmp.jpg");
        std::fs::write(&archived, b"already archived").expect("write archived file");

        let destination = day_dir.join("photo.jpg");
        let mover = mover_for(staging.path(), false);
        mover
            .move_file(&source, &destination)
            .await
            .expect("move succeeds");

        assert_eq!(
            std::fs::read(&archived).expect("read archived file"),
            b"already archived"
        );
        assert!(destination.exists());
    }

    #[tokio::test]
    async fn live_temps_of_this_process_survive_the_sweep() {
        let staging = TempDir::new().expect("staging dir");
        let archive = TempDir::new().expect("archive dir");
        let source = staging.path().join("photo.jpg");
        std::fs::write(&source, b"new shot").expect("write source");

        let day_dir = archive.path().join("2023/07/04");
        std::fs::create_dir_all(&day_dir).expect("create day dir");
        let live = day_dir.join(format!("photo.{}.1234567.tmp.jpg", std::process::id()));
        std::fs::write(&live, b"concurrent worker").expect("write live temp");

        let destination = day_dir.join("photo.jpg");
        let mover = mover_for(staging.path(), false);
        mover
            .move_file(&source, &destination)
            .await
            .expect("move succeeds");

        assert!(live.exists());
        assert!(destination.exists());
    }

    #[tokio::test]
    async fn a_failed_move_leaves_the_source_and_no_temp_behind() {
        let staging = TempDir::new().expect("staging dir");
        let archive = TempDir::new().expect("archive dir");
        let source = staging.path().join("photo.jpg");
        std::fs::write(&source, b"image bytes").expect("write source");

        // A directory squatting on the destination path makes the final
        // rename fail after the temp copy has been written.
        let day_dir = archive.path().join("2023/07/04");
        let destination = day_dir.join("photo.jpg");
        std::fs::create_dir_all(&destination).expect("create blocking dir");

        let mover = mover_for(staging.path(), false);
        let result = mover.move_file(&source, &destination).await;

        assert!(matches!(
            result,
            Err(IngestError::Io {
                operation: "rename",
                ..
            })
        ));
        assert!(source.exists());
        let leftovers: Vec<String> = std::fs::read_dir(&day_dir)
            .expect("read day dir")
            .flatten()
            .filter_map(|entry| entry.file_name().to_str().map(str::to_owned))
            .filter(|name| name.contains(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp artifacts left behind: {leftovers:?}");
    }

    #[test]
    fn temp_name_parsing_requires_the_exact_shape() {
        assert_eq!(parse_temp_pid("photo.999.1234567.tmp.jpg", "photo", ".jpg"), Some(999));
        assert_eq!(parse_temp_pid("photo.999.1234567.tmp", "photo", ""), Some(999));
        assert_eq!(parse_temp_pid("photo.tmp.jpg", "photo", ".jpg"), None);
        assert_eq!(parse_temp_pid("photo.jpg", "photo", ".jpg"), None);
        assert_eq!(parse_temp_pid("photo.999.abc.tmp.jpg", "photo", ".jpg"), None);
        assert_eq!(parse_temp_pid("photograph.999.1234567.tmp.jpg", "photo", ".jpg"), None);
    }

    #[test]
    fn temp_names_carry_pid_and_suffix() {
        let temp = temp_destination(Path::new("/archive/2023/07/04/photo.jpg"));
        let name = temp
            .file_name()
            .and_then(OsStr::to_str)
            .expect("utf-8 name");
        assert!(name.starts_with("photo."));
        assert!(name.contains(".tmp"));
        assert!(name.ends_with(".jpg"));
        assert_eq!(temp.parent(), Some(Path::new("/archive/2023/07/04")));
    }

    #[test]
    fn quarantine_names_tag_the_stem() {
        let name = quarantine_name(Path::new("/staging/clip.mov"));
        assert!(name.starts_with("clip_locked_"));
        assert!(name.ends_with(".mov"));
    }
}
