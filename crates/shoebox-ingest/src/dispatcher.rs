//! Initial scan and live watch dispatch over a bounded worker pool.
//!
//! # Design
//! - The startup scan enumerates the whole staging tree before any worker
//!   runs, so the queue depth gauge is honest from the first tick.
//! - Concurrency is a semaphore: a discovery waits for a permit instead of
//!   queueing unboundedly inside the runtime.
//! - Live watch events get a debounce sleep before claiming a permit; file
//!   managers fire bursts of events for a single logical drop.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use shoebox_config::defaults;
use shoebox_events::{Event, EventBus};
use shoebox_telemetry::Metrics;
use shoebox_watch::WatchSource;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};
use walkdir::{DirEntry, WalkDir};

use crate::coordinator::IngestionCoordinator;
use crate::filter;
use crate::model::IngestOutcome;
use crate::shutdown::StopFlag;

/// Outcome counts from the startup scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Candidate files enumerated under the watch root.
    pub discovered: usize,
    /// Files relocated into the archive tree.
    pub moved: usize,
    /// Byte-identical copies skipped and removed.
    pub duplicates: usize,
    /// Files the pipeline gave up on.
    pub failed: usize,
    /// Candidates filtered, refused, or abandoned by shutdown.
    pub ignored: usize,
}

impl ScanSummary {
    fn record(&mut self, outcome: &IngestOutcome) {
        match outcome {
            IngestOutcome::Moved { .. } => self.moved += 1,
            IngestOutcome::Duplicate => self.duplicates += 1,
            IngestOutcome::Failed { .. } => self.failed += 1,
            IngestOutcome::Ignored => self.ignored += 1,
        }
    }
}

/// Feeds discovered paths to the coordinator through a bounded pool.
pub struct Dispatcher {
    coordinator: Arc<IngestionCoordinator>,
    events: EventBus,
    metrics: Metrics,
    stop: StopFlag,
    permits: Arc<Semaphore>,
    debounce: Duration,
}

impl Dispatcher {
    /// Build a dispatcher with `workers` concurrent pipeline slots.
    #[must_use]
    pub fn new(
        coordinator: Arc<IngestionCoordinator>,
        workers: usize,
        events: EventBus,
        metrics: Metrics,
        stop: StopFlag,
    ) -> Self {
        Self {
            coordinator,
            events,
            metrics,
            stop,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            debounce: defaults::WATCH_DEBOUNCE,
        }
    }

    /// Enumerate everything already sitting under `root` and process it.
    pub async fn run_initial_scan(&self, root: &Path) -> ScanSummary {
        let candidates = enumerate(root);
        info!(count = candidates.len(), "initial scan enumerated candidates");
        self.metrics
            .set_queue_depth(i64::try_from(candidates.len()).unwrap_or(i64::MAX));

        let mut summary = ScanSummary {
            discovered: candidates.len(),
            ..ScanSummary::default()
        };
        let mut tasks = JoinSet::new();
        for path in candidates {
            if self.stop.is_triggered() {
                break;
            }
            self.events.publish(Event::FileDiscovered { path: path.clone() });
            let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                break;
            };
            let coordinator = Arc::clone(&self.coordinator);
            tasks.spawn(async move {
                let outcome = coordinator.process(&path).await;
                drop(permit);
                outcome
            });
        }
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => summary.record(&outcome),
                Err(err) => {
                    error!(error = %err, "pipeline worker task failed");
                    summary.failed += 1;
                }
            }
        }
        self.metrics.set_queue_depth(0);
        summary
    }

    /// Consume the live watch stream until shutdown or the watcher closes.
    pub async fn run_watch_stream(&self, mut source: WatchSource) {
        let mut tasks: JoinSet<()> = JoinSet::new();
        loop {
            tokio::select! {
                () = self.stop.triggered() => break,
                discovery = source.recv() => {
                    let Some(discovery) = discovery else {
                        break;
                    };
                    if !filter::is_ingestible(&discovery.path, self.coordinator.watch_root()) {
                        continue;
                    }
                    debug!(
                        path = %discovery.path.display(),
                        kind = ?discovery.kind,
                        "scheduling discovered file"
                    );
                    self.events.publish(Event::FileDiscovered {
                        path: discovery.path.clone(),
                    });
                    self.spawn_debounced(&mut tasks, discovery.path);
                    // Reap finished workers so the set stays small.
                    while tasks.try_join_next().is_some() {}
                }
            }
        }
        while tasks.join_next().await.is_some() {}
    }

    fn spawn_debounced(&self, tasks: &mut JoinSet<()>, path: PathBuf) {
        let coordinator = Arc::clone(&self.coordinator);
        let permits = Arc::clone(&self.permits);
        let stop = self.stop.clone();
        let debounce = self.debounce;
        tasks.spawn(async move {
            tokio::time::sleep(debounce).await;
            if stop.is_triggered() {
                return;
            }
            let Ok(permit) = permits.acquire_owned().await else {
                return;
            };
            let _outcome = coordinator.process(&path).await;
            drop(permit);
        });
    }
}

/// Walk the staging tree and collect ingestible files, skipping ignored
/// directories wholesale.
fn enumerate(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| !is_skipped_dir(entry))
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(DirEntry::into_path)
        .filter(|path| filter::is_ingestible(path, root))
        .collect()
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(filter::is_ignored_dir_name)
}
