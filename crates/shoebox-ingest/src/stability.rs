//! Mid-write detection via the adaptive stability probe.
//!
//! # Design
//! - The quiet window scales with file size (roughly 0.2s per MiB) between
//!   the configured minimum and a fixed ceiling, so a large video gets a
//!   longer settle period than a phone photo.
//! - The total wait budget also scales with size and is capped by
//!   configuration; a file that never settles is reported unstable, not
//!   retried forever.
//! - An append-mode open probes for writers still holding the file; any
//!   open failure resets the quiet window.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::time::{Duration, Instant};

use shoebox_config::StabilitySettings;
use tracing::debug;

use crate::shutdown::StopFlag;

/// Interval between size and lock probes.
const POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Ceiling applied to the size-scaled quiet window.
const WINDOW_CEILING: Duration = Duration::from_secs(60);
/// Quiet-window growth per MiB of file size.
const WINDOW_PER_MIB: Duration = Duration::from_millis(200);
/// Floor applied to the size-scaled wait budget.
const BUDGET_FLOOR: Duration = Duration::from_secs(60);
/// Wait-budget growth per MiB of file size.
const BUDGET_PER_MIB: Duration = Duration::from_secs(2);

const BYTES_PER_MIB: u64 = 1024 * 1024;

/// Probe that decides when a file has stopped changing.
#[derive(Debug, Clone, Copy)]
pub struct StabilityProbe {
    settings: StabilitySettings,
}

impl StabilityProbe {
    /// Build a probe with the given tuning.
    #[must_use]
    pub const fn new(settings: StabilitySettings) -> Self {
        Self { settings }
    }

    /// Wait until `path` holds steady for its quiet window.
    ///
    /// Returns `false` if the file vanishes, stays zero bytes, keeps
    /// changing past the wait budget, or shutdown is requested.
    pub async fn wait_until_stable(&self, path: &Path, stop: &StopFlag) -> bool {
        let Ok(metadata) = fs::metadata(path) else {
            return false;
        };
        let size_mib = metadata.len().div_ceil(BYTES_PER_MIB).max(1);
        let window = self.quiet_window(size_mib);
        let budget = self.wait_budget(size_mib);

        let started = Instant::now();
        let mut last_len = metadata.len();
        let mut quiet_since: Option<Instant> = None;

        loop {
            if stop.is_triggered() {
                return false;
            }
            if started.elapsed() > budget {
                debug!(
                    path = %path.display(),
                    budget_secs = budget.as_secs(),
                    "stability budget exhausted"
                );
                return false;
            }

            if OpenOptions::new().append(true).open(path).is_err() {
                // A writer still holds the file (or it is mid-rename).
                quiet_since = None;
            } else {
                let Ok(current) = fs::metadata(path) else {
                    return false;
                };
                let len = current.len();
                if len == last_len && len > 0 {
                    let since = *quiet_since.get_or_insert_with(Instant::now);
                    if since.elapsed() >= window {
                        return true;
                    }
                } else {
                    last_len = len;
                    quiet_since = None;
                }
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    fn quiet_window(&self, size_mib: u64) -> Duration {
        let scaled = WINDOW_PER_MIB.saturating_mul(clamp_to_u32(size_mib));
        let ceiling = WINDOW_CEILING.max(self.settings.min_stable_window);
        scaled.clamp(self.settings.min_stable_window, ceiling)
    }

    fn wait_budget(&self, size_mib: u64) -> Duration {
        let scaled = BUDGET_PER_MIB.saturating_mul(clamp_to_u32(size_mib));
        scaled.max(BUDGET_FLOOR).min(self.settings.max_wait)
    }
}

fn clamp_to_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
