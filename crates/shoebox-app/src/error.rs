//! # Design
//!
//! - Centralize application-level errors for the bootstrap sequence.
//! - Keep error messages constant while carrying context fields for
//!   debugging.
//! - Preserve source errors without re-logging at call sites.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: shoebox_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: shoebox_telemetry::TelemetryError,
    },
    /// Filesystem watch operations failed.
    #[error("filesystem watch failed")]
    Watch {
        /// Operation identifier.
        operation: &'static str,
        /// Source watch error.
        source: shoebox_watch::WatchError,
    },
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Optional path involved in the failure.
        path: Option<PathBuf>,
        /// Source IO error.
        source: io::Error,
    },
    /// Startup conditions were not met.
    #[error("invalid startup configuration")]
    InvalidConfig {
        /// Field name that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Optional value associated with the failure.
        value: Option<String>,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: shoebox_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: shoebox_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn watch(operation: &'static str, source: shoebox_watch::WatchError) -> Self {
        Self::Watch { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_build_the_expected_variants() {
        let config = AppError::config(
            "settings.validate",
            shoebox_config::ConfigError::InvalidField {
                field: "workers",
                reason: "zero",
                value: Some("0".to_owned()),
            },
        );
        assert!(matches!(config, AppError::Config { .. }));

        let watch = AppError::watch(
            "watch.start",
            shoebox_watch::WatchError::Watch {
                path: PathBuf::from("/staging"),
                source: notify_error(),
            },
        );
        assert!(matches!(watch, AppError::Watch { .. }));
    }

    fn notify_error() -> notify::Error {
        notify::Error::generic("watch failed")
    }
}
