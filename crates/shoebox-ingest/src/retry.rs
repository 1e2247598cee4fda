//! Retry/backoff policy shared by mutating filesystem operations.
//!
//! Lock contention shows up as `PermissionDenied` or `ResourceBusy` from
//! the OS; those attempts are retried with doubled delays plus jitter.
//! Anything else fails immediately.

use std::future::Future;
use std::io;
use std::path::Path;

use rand::Rng;
use shoebox_config::RetrySettings;
use shoebox_telemetry::Metrics;
use tracing::warn;

use crate::error::{IngestError, IngestResult};
use crate::shutdown::StopFlag;

/// Whether an I/O error is worth retrying.
pub(crate) fn is_retryable(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::PermissionDenied
            | io::ErrorKind::ResourceBusy
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::Interrupted
    )
}

/// Run `attempt` until it succeeds, fails non-retryably, or exhausts the
/// attempt ceiling. Sleeps between attempts with exponential backoff and
/// jitter; abandons the loop when shutdown is requested.
///
/// The closure returns a `Send` future so callers can run the whole loop
/// on spawned worker tasks.
pub(crate) async fn with_retries<T, F, Fut>(
    settings: &RetrySettings,
    operation: &'static str,
    path: &Path,
    metrics: &Metrics,
    stop: &StopFlag,
    mut attempt: F,
) -> IngestResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<T>> + Send,
{
    let mut delay = settings.base_delay;
    let mut attempt_number = 0_u32;
    loop {
        attempt_number += 1;
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(source) if !is_retryable(&source) => {
                return Err(IngestError::Io {
                    operation,
                    path: path.to_path_buf(),
                    source,
                });
            }
            Err(source) => {
                if attempt_number >= settings.attempts {
                    return Err(IngestError::RetriesExhausted {
                        operation,
                        path: path.to_path_buf(),
                        attempts: attempt_number,
                        source,
                    });
                }
                warn!(
                    operation,
                    path = %path.display(),
                    attempt = attempt_number,
                    error = %source,
                    "retryable filesystem failure; backing off"
                );
                metrics.inc_retry(operation);
                if stop.is_triggered() {
                    return Err(IngestError::Cancelled {
                        operation,
                        path: path.to_path_buf(),
                    });
                }
                let jitter = settings.jitter.mul_f64(rand::rng().random_range(0.0..=1.0));
                let pause = delay.min(settings.max_delay).saturating_add(jitter);
                tokio::time::sleep(pause).await;
                delay = delay.saturating_mul(2);
            }
        }
    }
}
