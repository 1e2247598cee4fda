//! Error types for pipeline operations.
//!
//! Stage failures carry the operation label, the affected path, and the
//! underlying I/O error so operators can see exactly which step gave up.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for pipeline operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors raised by mutating pipeline stages.
#[derive(Debug, Error)]
pub enum IngestError {
    /// A filesystem operation failed with a non-retryable error.
    #[error("filesystem operation failed")]
    Io {
        /// Operation label (copy, rename, delete_source, ...).
        operation: &'static str,
        /// Path the operation was acting on.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// A retryable filesystem operation kept failing until the attempt
    /// ceiling was reached.
    #[error("retry attempts exhausted")]
    RetriesExhausted {
        /// Operation label (copy, rename, delete_source, ...).
        operation: &'static str,
        /// Path the operation was acting on.
        path: PathBuf,
        /// Number of attempts made before giving up.
        attempts: u32,
        /// Error from the final attempt.
        source: io::Error,
    },
    /// Shutdown was requested between retry attempts.
    #[error("operation cancelled by shutdown")]
    Cancelled {
        /// Operation label that was abandoned.
        operation: &'static str,
        /// Path the operation was acting on.
        path: PathBuf,
    },
}
