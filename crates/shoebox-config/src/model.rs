//! Typed settings models consumed by the ingestion pipeline.
//!
//! Every knob is passed explicitly into the core; nothing is read from
//! process-wide state after startup.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;

/// Complete settings snapshot handed to the pipeline at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    /// Staging directory watched for incoming media files.
    pub watch_root: PathBuf,
    /// Root of the date-bucketed archive tree.
    pub archive_root: PathBuf,
    /// Number of concurrent pipeline workers.
    pub workers: usize,
    /// When set, every mutating filesystem operation is logged but skipped.
    pub dry_run: bool,
    /// Whether size-matched duplicate candidates are confirmed by checksum.
    pub checksum_on_duplicate: bool,
    /// Buffer size used for the streaming copy.
    pub copy_buffer_bytes: usize,
    /// Stability probe tuning.
    pub stability: StabilitySettings,
    /// Retry/backoff tuning shared by copy, rename, and delete.
    pub retry: RetrySettings,
}

impl IngestSettings {
    /// Build a settings snapshot with default tuning for the given roots.
    #[must_use]
    pub fn new(watch_root: PathBuf, archive_root: PathBuf) -> Self {
        Self {
            watch_root,
            archive_root,
            workers: defaults::WORKERS,
            dry_run: false,
            checksum_on_duplicate: true,
            copy_buffer_bytes: defaults::COPY_BUFFER_BYTES,
            stability: StabilitySettings::default(),
            retry: RetrySettings::default(),
        }
    }
}

/// Tuning for the file stability probe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StabilitySettings {
    /// Minimum quiet window before a file counts as stable. The probe scales
    /// this up for large files, capped at a fixed ceiling.
    pub min_stable_window: Duration,
    /// Ceiling on the total time spent waiting for a single file to settle.
    pub max_wait: Duration,
}

impl Default for StabilitySettings {
    fn default() -> Self {
        Self {
            min_stable_window: defaults::MIN_STABLE_WINDOW,
            max_wait: defaults::MAX_STABILITY_WAIT,
        }
    }
}

/// Tuning for the shared retry/backoff policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Maximum number of attempts per filesystem operation.
    pub attempts: u32,
    /// Initial delay, doubled after each failed attempt.
    pub base_delay: Duration,
    /// Cap applied to the doubled delay.
    pub max_delay: Duration,
    /// Upper bound for the random jitter added to each delay.
    pub jitter: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: defaults::RETRY_ATTEMPTS,
            base_delay: defaults::RETRY_BASE_DELAY,
            max_delay: defaults::RETRY_MAX_DELAY,
            jitter: defaults::RETRY_JITTER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_round_trip_through_json() {
        let settings = IngestSettings::new(PathBuf::from("/staging"), PathBuf::from("/archive"));
        let json = serde_json::to_string(&settings).expect("settings serialize");
        let back: IngestSettings = serde_json::from_str(&json).expect("settings deserialize");
        assert_eq!(back.workers, defaults::WORKERS);
        assert_eq!(back.copy_buffer_bytes, defaults::COPY_BUFFER_BYTES);
        assert!(back.checksum_on_duplicate);
        assert!(!back.dry_run);
    }
}
