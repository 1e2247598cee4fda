//! Shared pipeline data types.

use std::path::PathBuf;

use chrono::{Datelike, NaiveDateTime};

/// Date bucket a file is archived into, derived from its capture time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestinationBucket {
    /// Four-digit year.
    pub year: i32,
    /// Month of year, 1-12.
    pub month: u32,
    /// Day of month, 1-31.
    pub day: u32,
}

impl DestinationBucket {
    /// Build a bucket from a capture timestamp.
    #[must_use]
    pub fn from_datetime(timestamp: NaiveDateTime) -> Self {
        Self {
            year: timestamp.year(),
            month: timestamp.month(),
            day: timestamp.day(),
        }
    }

    /// Relative archive directory for this bucket: `YYYY/MM/DD`.
    #[must_use]
    pub fn relative_dir(&self) -> PathBuf {
        PathBuf::from(format!(
            "{:04}/{:02}/{:02}",
            self.year, self.month, self.day
        ))
    }
}

/// Terminal outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The path was filtered out, already claimed, cooling down, or the run
    /// was abandoned by shutdown.
    Ignored,
    /// The file was relocated into the archive tree.
    Moved {
        /// Final path inside the archive root.
        destination: PathBuf,
    },
    /// A byte-identical copy already existed; the source was removed.
    Duplicate,
    /// The pipeline gave up on this file.
    Failed {
        /// Failure detail for operators.
        message: String,
    },
}

impl IngestOutcome {
    /// Metrics label for this outcome.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Ignored => "ignored",
            Self::Moved { .. } => "moved",
            Self::Duplicate => "duplicate",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    /// Waiting for the file to stop changing.
    Stability,
    /// Resolving the capture time and destination bucket.
    Classify,
    /// Checking for a byte-identical copy at the destination.
    Duplicate,
    /// Relocating the file into the archive tree.
    Move,
    /// Pruning emptied directories under the watch root.
    Reap,
}

impl IngestStage {
    /// Stable label used in events and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stability => "stability",
            Self::Classify => "classify",
            Self::Duplicate => "duplicate",
            Self::Move => "move",
            Self::Reap => "reap",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn bucket_paths_are_zero_padded() {
        let timestamp = NaiveDate::from_ymd_opt(2023, 7, 4)
            .expect("valid date")
            .and_hms_opt(9, 30, 0)
            .expect("valid time");
        let bucket = DestinationBucket::from_datetime(timestamp);
        assert_eq!(bucket.relative_dir(), PathBuf::from("2023/07/04"));
    }

    #[test]
    fn outcome_labels_are_stable() {
        assert_eq!(IngestOutcome::Ignored.label(), "ignored");
        assert_eq!(
            IngestOutcome::Moved {
                destination: PathBuf::from("/archive/2023/07/04/a.jpg"),
            }
            .label(),
            "moved"
        );
        assert_eq!(IngestOutcome::Duplicate.label(), "duplicate");
    }
}
