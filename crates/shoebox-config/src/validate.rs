//! Validation applied to ingestion settings before the pipeline boots.
//!
//! Root existence checks live in the application bootstrap (they are fatal
//! startup conditions, not value errors); this module only rejects values
//! that would make the pipeline misbehave.

use crate::error::{ConfigError, ConfigResult};
use crate::model::IngestSettings;

/// Validate a settings snapshot.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for the first field whose value
/// would break the pipeline (zero workers, empty copy buffer, no retry
/// attempts, or a stability window that exceeds its own wait budget).
pub fn validate_settings(settings: &IngestSettings) -> ConfigResult<()> {
    if settings.workers == 0 {
        return Err(ConfigError::InvalidField {
            field: "workers",
            reason: "zero",
            value: Some(settings.workers.to_string()),
        });
    }
    if settings.copy_buffer_bytes == 0 {
        return Err(ConfigError::InvalidField {
            field: "copy_buffer_bytes",
            reason: "zero",
            value: Some(settings.copy_buffer_bytes.to_string()),
        });
    }
    if settings.retry.attempts == 0 {
        return Err(ConfigError::InvalidField {
            field: "retry.attempts",
            reason: "zero",
            value: Some(settings.retry.attempts.to_string()),
        });
    }
    if settings.stability.min_stable_window > settings.stability.max_wait {
        return Err(ConfigError::InvalidField {
            field: "stability.min_stable_window",
            reason: "exceeds_max_wait",
            value: Some(format!("{:?}", settings.stability.min_stable_window)),
        });
    }
    if settings.watch_root == settings.archive_root {
        return Err(ConfigError::InvalidField {
            field: "archive_root",
            reason: "same_as_watch_root",
            value: Some(settings.archive_root.display().to_string()),
        });
    }
    Ok(())
}
