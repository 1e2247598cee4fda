//! Error types for watch operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for watch operations.
pub type WatchResult<T> = Result<T, WatchError>;

/// Errors raised while installing the filesystem watcher.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Constructing the platform watcher failed.
    #[error("failed to create filesystem watcher")]
    Create {
        /// Underlying notify error.
        source: notify::Error,
    },
    /// Registering the watch root failed.
    #[error("failed to watch directory")]
    Watch {
        /// Directory that could not be watched.
        path: PathBuf,
        /// Underlying notify error.
        source: notify::Error,
    },
}
