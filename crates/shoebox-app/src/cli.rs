//! Command-line interface for the Shoebox archiver.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use shoebox_config::{IngestSettings, defaults};

/// Watches a staging directory and archives media files into a date tree.
#[derive(Debug, Parser)]
#[command(name = "shoebox", version, about)]
pub struct Cli {
    /// Staging directory to watch for incoming media files.
    #[arg(long, env = "SHOEBOX_WATCH_ROOT")]
    pub watch_root: PathBuf,

    /// Archive root receiving the `YYYY/MM/DD` tree.
    #[arg(long, env = "SHOEBOX_ARCHIVE_ROOT")]
    pub archive_root: PathBuf,

    /// Number of concurrent pipeline workers.
    #[arg(long, default_value_t = defaults::WORKERS)]
    pub workers: usize,

    /// Buffer size in bytes for the streaming copy.
    #[arg(long, default_value_t = defaults::COPY_BUFFER_BYTES)]
    pub copy_buffer_bytes: usize,

    /// Minimum quiet window in seconds before a file counts as stable.
    #[arg(long, default_value_t = defaults::MIN_STABLE_WINDOW.as_secs())]
    pub min_stable_secs: u64,

    /// Ceiling in seconds on the wait for a single file to settle.
    #[arg(long, default_value_t = defaults::MAX_STABILITY_WAIT.as_secs())]
    pub max_stability_wait_secs: u64,

    /// Retry attempts per filesystem operation.
    #[arg(long, default_value_t = defaults::RETRY_ATTEMPTS)]
    pub retry_attempts: u32,

    /// Log planned operations without touching any file.
    #[arg(long)]
    pub dry_run: bool,

    /// Trust size matches when checking duplicates instead of verifying
    /// checksums.
    #[arg(long)]
    pub no_checksum: bool,

    /// Process the existing backlog and exit instead of watching.
    #[arg(long)]
    pub scan_only: bool,
}

impl Cli {
    /// Convert the parsed arguments into a pipeline settings snapshot.
    #[must_use]
    pub fn into_settings(self) -> IngestSettings {
        let mut settings = IngestSettings::new(self.watch_root, self.archive_root);
        settings.workers = self.workers;
        settings.dry_run = self.dry_run;
        settings.checksum_on_duplicate = !self.no_checksum;
        settings.copy_buffer_bytes = self.copy_buffer_bytes;
        settings.stability.min_stable_window = Duration::from_secs(self.min_stable_secs);
        settings.stability.max_wait = Duration::from_secs(self.max_stability_wait_secs);
        settings.retry.attempts = self.retry_attempts;
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_roots_and_flags() {
        let cli = Cli::try_parse_from([
            "shoebox",
            "--watch-root",
            "/staging",
            "--archive-root",
            "/archive",
            "--dry-run",
            "--no-checksum",
        ])
        .expect("arguments parse");

        assert!(cli.dry_run);
        assert!(!cli.scan_only);
        let settings = cli.into_settings();
        assert_eq!(settings.watch_root, PathBuf::from("/staging"));
        assert_eq!(settings.archive_root, PathBuf::from("/archive"));
        assert_eq!(settings.workers, defaults::WORKERS);
        assert_eq!(settings.copy_buffer_bytes, defaults::COPY_BUFFER_BYTES);
        assert_eq!(settings.stability.min_stable_window, defaults::MIN_STABLE_WINDOW);
        assert_eq!(settings.retry.attempts, defaults::RETRY_ATTEMPTS);
        assert!(!settings.checksum_on_duplicate);
    }

    #[test]
    fn tuning_flags_override_the_defaults() {
        let cli = Cli::try_parse_from([
            "shoebox",
            "--watch-root",
            "/staging",
            "--archive-root",
            "/archive",
            "--workers",
            "8",
            "--min-stable-secs",
            "1",
            "--retry-attempts",
            "2",
        ])
        .expect("arguments parse");

        let settings = cli.into_settings();
        assert_eq!(settings.workers, 8);
        assert_eq!(settings.stability.min_stable_window, Duration::from_secs(1));
        assert_eq!(settings.retry.attempts, 2);
    }

    #[test]
    fn both_roots_are_required() {
        assert!(Cli::try_parse_from(["shoebox", "--watch-root", "/staging"]).is_err());
    }
}
