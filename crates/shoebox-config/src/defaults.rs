//! Baseline values for ingestion settings.
//!
//! # Design
//! - Centralize tuning constants so defaults and validation stay consistent.
//! - Keep time-based values explicit for auditability.

use std::time::Duration;

/// Default number of concurrent pipeline workers.
pub const WORKERS: usize = 4;
/// Default streaming copy buffer size (8 MiB, sized for large video files).
pub const COPY_BUFFER_BYTES: usize = 8 * 1024 * 1024;
/// Default minimum quiet window before a file counts as stable.
pub const MIN_STABLE_WINDOW: Duration = Duration::from_secs(2);
/// Default ceiling on the total time spent waiting for one file to settle.
pub const MAX_STABILITY_WAIT: Duration = Duration::from_secs(1800);
/// Default retry attempt ceiling for copy/rename/delete operations.
pub const RETRY_ATTEMPTS: u32 = 8;
/// Default initial retry backoff delay.
pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
/// Default cap applied to the doubled backoff delay.
pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(5);
/// Default upper bound for random jitter added to each backoff delay.
pub const RETRY_JITTER: Duration = Duration::from_millis(250);
/// Cool-down window during which a processed path is not re-claimed.
pub const HISTORY_COOL_DOWN: Duration = Duration::from_secs(300);
/// High-water mark for the processed-path history before eviction starts.
pub const HISTORY_HIGH_WATER: usize = 1000;
/// Quiet delay applied to live watch events before dispatching a worker.
pub const WATCH_DEBOUNCE: Duration = Duration::from_secs(5);
