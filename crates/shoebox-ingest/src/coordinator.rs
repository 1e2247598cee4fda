//! The per-file pipeline state machine.
//!
//! # Design
//! - One call to [`IngestionCoordinator::process`] takes a discovered path
//!   through claim, stability, classification, duplicate check, move, and
//!   pruning, and always produces exactly one terminal outcome.
//! - The claim is held by a drop guard, so the registry is released on
//!   every exit path, panics included.
//! - Stage boundaries publish progress events and bump stage counters;
//!   terminal outcomes publish their own event and bump the outcome
//!   counter.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use shoebox_config::IngestSettings;
use shoebox_events::{Event, EventBus};
use shoebox_metadata::resolve_capture_time;
use shoebox_telemetry::Metrics;
use tracing::{debug, error, info, warn};

use crate::classify;
use crate::duplicate;
use crate::filter;
use crate::model::{IngestOutcome, IngestStage};
use crate::mover::{AtomicMover, MoveResult};
use crate::reaper;
use crate::registry::{ClaimDecision, ProcessingRegistry};
use crate::shutdown::StopFlag;
use crate::stability::StabilityProbe;

/// Outer probe attempts before a file is declared permanently unstable.
const STABILITY_ATTEMPTS: u32 = 10;
/// Pause between outer probe attempts.
const STABILITY_RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Drives one file at a time through the full pipeline.
pub struct IngestionCoordinator {
    settings: Arc<IngestSettings>,
    watch_root: PathBuf,
    registry: Arc<ProcessingRegistry>,
    probe: StabilityProbe,
    mover: AtomicMover,
    events: EventBus,
    metrics: Metrics,
    stop: StopFlag,
}

impl IngestionCoordinator {
    /// Build a coordinator wired to the shared event bus and metrics.
    #[must_use]
    pub fn new(
        settings: Arc<IngestSettings>,
        events: EventBus,
        metrics: Metrics,
        stop: StopFlag,
    ) -> Self {
        let probe = StabilityProbe::new(settings.stability);
        let mover = AtomicMover::new(&settings, metrics.clone(), stop.clone());
        // Discovered paths are canonicalized, so prefix checks against the
        // root must compare canonical forms.
        let watch_root = settings
            .watch_root
            .canonicalize()
            .unwrap_or_else(|_| settings.watch_root.clone());
        Self {
            settings,
            watch_root,
            registry: Arc::new(ProcessingRegistry::with_defaults()),
            probe,
            mover,
            events,
            metrics,
            stop,
        }
    }

    /// Number of files currently claimed by workers.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.registry.in_flight_count()
    }

    /// The canonicalized staging root this coordinator serves.
    #[must_use]
    pub fn watch_root(&self) -> &Path {
        &self.watch_root
    }

    /// Run the full pipeline for one discovered path.
    ///
    /// Filtered, already-claimed, and cooling-down paths short-circuit to
    /// [`IngestOutcome::Ignored`] without touching the filesystem.
    pub async fn process(&self, path: &Path) -> IngestOutcome {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if !path.is_file() || !filter::is_ingestible(&path, &self.watch_root) {
            debug!(path = %path.display(), "path filtered out");
            self.metrics.inc_outcome(IngestOutcome::Ignored.label());
            return IngestOutcome::Ignored;
        }
        match self.registry.try_claim(&path) {
            ClaimDecision::Claimed => {}
            decision @ (ClaimDecision::AlreadyInFlight | ClaimDecision::CoolingDown) => {
                debug!(path = %path.display(), ?decision, "claim refused");
                self.metrics.inc_outcome(IngestOutcome::Ignored.label());
                return IngestOutcome::Ignored;
            }
        }
        let _guard = ClaimGuard {
            registry: &self.registry,
            metrics: &self.metrics,
            path: path.clone(),
        };
        self.sync_inflight_gauge();

        self.events.publish(Event::IngestStarted { path: path.clone() });
        let outcome = self.run_stages(&path).await;

        match &outcome {
            IngestOutcome::Moved { destination } => {
                info!(
                    source = %path.display(),
                    destination = %destination.display(),
                    "file archived"
                );
                self.events.publish(Event::FileMoved {
                    source: path.clone(),
                    destination: destination.clone(),
                });
            }
            IngestOutcome::Duplicate => {
                info!(path = %path.display(), "duplicate skipped");
                self.events.publish(Event::DuplicateSkipped { path: path.clone() });
            }
            IngestOutcome::Failed { message } => {
                error!(path = %path.display(), message, "ingest failed");
                self.events.publish(Event::IngestFailed {
                    path: path.clone(),
                    message: message.clone(),
                });
            }
            IngestOutcome::Ignored => {}
        }
        self.metrics.inc_outcome(outcome.label());
        outcome
    }

    async fn run_stages(&self, path: &Path) -> IngestOutcome {
        self.progress(path, IngestStage::Stability);
        if !self.await_stability(path).await {
            if self.stop.is_triggered() {
                debug!(path = %path.display(), "shutdown requested; abandoning claimed file");
                return IngestOutcome::Ignored;
            }
            self.metrics
                .inc_stage(IngestStage::Stability.as_str(), "failed");
            return IngestOutcome::Failed {
                message: "file never settled within the stability budget".to_owned(),
            };
        }
        self.metrics
            .inc_stage(IngestStage::Stability.as_str(), "completed");

        self.progress(path, IngestStage::Classify);
        let capture_time = self.capture_time(path).await;
        let bucket = classify::resolve_destination_bucket(path, capture_time);
        let destination_dir = self.settings.archive_root.join(bucket.relative_dir());
        self.metrics
            .inc_stage(IngestStage::Classify.as_str(), "completed");

        self.progress(path, IngestStage::Duplicate);
        let file_name = path
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or("unnamed")
            .to_owned();
        let primary_destination = destination_dir.join(&file_name);
        if duplicate::is_duplicate(path, &primary_destination, self.settings.checksum_on_duplicate)
            .await
        {
            self.metrics
                .inc_stage(IngestStage::Duplicate.as_str(), "completed");
            self.remove_duplicate_source(path);
            self.reap(path);
            return IngestOutcome::Duplicate;
        }
        self.metrics
            .inc_stage(IngestStage::Duplicate.as_str(), "completed");

        self.progress(path, IngestStage::Move);
        let destination = classify::unique_destination(&destination_dir, &file_name);
        self.relocate(path, destination).await
    }

    async fn relocate(&self, path: &Path, destination: PathBuf) -> IngestOutcome {
        match self.mover.move_file(path, &destination).await {
            Ok(result) => {
                self.metrics.inc_stage(IngestStage::Move.as_str(), "completed");
                if let MoveResult::MovedSourceQuarantined { quarantine_path } = result {
                    self.events.publish(Event::FileQuarantined {
                        path: path.to_path_buf(),
                        quarantine_path,
                    });
                }
                self.reap(path);
                IngestOutcome::Moved { destination }
            }
            Err(move_err) => {
                warn!(
                    path = %path.display(),
                    error = %move_err,
                    "atomic move failed; attempting plain copy fallback"
                );
                self.metrics.inc_stage(IngestStage::Move.as_str(), "failed");
                match self.mover.copy_in_place(path, &destination).await {
                    Ok(()) => {
                        self.reap(path);
                        IngestOutcome::Moved { destination }
                    }
                    Err(fallback_err) => {
                        self.reap(path);
                        IngestOutcome::Failed {
                            message: format!(
                                "move failed ({move_err}); fallback copy failed ({fallback_err})"
                            ),
                        }
                    }
                }
            }
        }
    }

    async fn await_stability(&self, path: &Path) -> bool {
        for attempt in 1..=STABILITY_ATTEMPTS {
            if self.stop.is_triggered() {
                return false;
            }
            if self.probe.wait_until_stable(path, &self.stop).await {
                return true;
            }
            debug!(
                path = %path.display(),
                attempt,
                "file not yet stable; pausing before the next probe"
            );
            tokio::time::sleep(STABILITY_RETRY_PAUSE).await;
        }
        false
    }

    async fn capture_time(&self, path: &Path) -> Option<NaiveDateTime> {
        let owned = path.to_path_buf();
        match tokio::task::spawn_blocking(move || resolve_capture_time(&owned)).await {
            Ok(capture_time) => capture_time,
            Err(err) => {
                error!(error = %err, "capture-time task failed");
                None
            }
        }
    }

    fn remove_duplicate_source(&self, path: &Path) {
        if self.settings.dry_run {
            info!(path = %path.display(), "dry-run: would delete duplicate source");
            return;
        }
        if let Err(err) = fs::remove_file(path) {
            warn!(
                path = %path.display(),
                error = %err,
                "duplicate source could not be deleted"
            );
        }
    }

    fn reap(&self, path: &Path) {
        if self.settings.dry_run {
            return;
        }
        self.progress(path, IngestStage::Reap);
        if let Some(parent) = path.parent() {
            reaper::prune_empty_dirs(parent, &self.watch_root);
        }
        self.metrics.inc_stage(IngestStage::Reap.as_str(), "completed");
    }

    fn progress(&self, path: &Path, stage: IngestStage) {
        self.events.publish(Event::IngestProgress {
            path: path.to_path_buf(),
            stage: stage.as_str().to_owned(),
        });
    }

    fn sync_inflight_gauge(&self) {
        let count = i64::try_from(self.registry.in_flight_count()).unwrap_or(i64::MAX);
        self.metrics.set_inflight(count);
    }
}

/// Releases the registry claim when a pipeline run exits, by any path.
struct ClaimGuard<'a> {
    registry: &'a ProcessingRegistry,
    metrics: &'a Metrics,
    path: PathBuf,
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.path);
        let count = i64::try_from(self.registry.in_flight_count()).unwrap_or(i64::MAX);
        self.metrics.set_inflight(count);
    }
}
