//! Startup sequence and the scan/watch lifecycle.
//!
//! # Design
//! - Fatal conditions (missing watch root, uncreatable archive root,
//!   invalid settings) abort before any worker starts.
//! - The backlog scan always runs first so the tree is consistent before
//!   live events are trusted.
//! - Ctrl-C trips the shared stop flag; in-flight files get a bounded
//!   drain window before the process exits.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use shoebox_config::validate_settings;
use shoebox_events::EventBus;
use shoebox_ingest::{Dispatcher, IngestionCoordinator, StopFlag};
use shoebox_telemetry::{LoggingConfig, Metrics};
use shoebox_watch::WatchSource;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::cli::Cli;
use crate::error::{AppError, AppResult};

/// How long shutdown waits for claimed files to finish.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);
/// Poll interval while draining.
const DRAIN_POLL: Duration = Duration::from_secs(1);

/// Parse the command line, install logging, and run until shutdown.
///
/// # Errors
///
/// Returns an error if logging cannot be installed or startup fails; see
/// [`run_with`].
pub async fn run_app() -> AppResult<()> {
    shoebox_telemetry::init_logging(&LoggingConfig::default())
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    run_with(Cli::parse()).await
}

/// Run the archiver with already-parsed arguments. Assumes logging is
/// installed.
///
/// # Errors
///
/// Returns an error when the settings fail validation, the watch root does
/// not exist, the archive root cannot be created, or the filesystem
/// watcher cannot be started.
pub async fn run_with(cli: Cli) -> AppResult<()> {
    let scan_only = cli.scan_only;
    let settings = cli.into_settings();
    validate_settings(&settings).map_err(|err| AppError::config("settings.validate", err))?;

    if !settings.watch_root.is_dir() {
        return Err(AppError::InvalidConfig {
            field: "watch_root",
            reason: "not_a_directory",
            value: Some(settings.watch_root.display().to_string()),
        });
    }
    fs::create_dir_all(&settings.archive_root).map_err(|err| AppError::Io {
        operation: "create_archive_root",
        path: Some(settings.archive_root.clone()),
        source: err,
    })?;

    let events = EventBus::new();
    let metrics = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
    let stop = StopFlag::new();

    let settings = Arc::new(settings);
    let coordinator = Arc::new(IngestionCoordinator::new(
        Arc::clone(&settings),
        events.clone(),
        metrics.clone(),
        stop.clone(),
    ));
    let dispatcher = Dispatcher::new(
        Arc::clone(&coordinator),
        settings.workers,
        events.clone(),
        metrics.clone(),
        stop.clone(),
    );

    let signal_stop = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_stop.trigger();
        }
    });

    info!(
        watch_root = %settings.watch_root.display(),
        archive_root = %settings.archive_root.display(),
        workers = settings.workers,
        dry_run = settings.dry_run,
        build = shoebox_telemetry::build_sha(),
        "shoebox starting"
    );

    let summary = dispatcher.run_initial_scan(&settings.watch_root).await;
    info!(
        discovered = summary.discovered,
        moved = summary.moved,
        duplicates = summary.duplicates,
        failed = summary.failed,
        ignored = summary.ignored,
        "initial scan complete"
    );

    if !scan_only && !stop.is_triggered() {
        let source = WatchSource::start(&settings.watch_root)
            .map_err(|err| AppError::watch("watch.start", err))?;
        info!("watching for new files");
        dispatcher.run_watch_stream(source).await;
    }

    stop.trigger();
    drain(&coordinator).await;
    info!("shutdown complete");
    Ok(())
}

/// Wait for claimed files to finish, up to the drain timeout.
async fn drain(coordinator: &IngestionCoordinator) {
    let deadline = Instant::now() + DRAIN_TIMEOUT;
    while coordinator.in_flight() > 0 {
        if Instant::now() >= deadline {
            warn!(
                in_flight = coordinator.in_flight(),
                "drain timeout reached; abandoning in-flight files"
            );
            return;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
}
