//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes a minimal set of counters/gauges relevant to the ingestion
//!   pipeline.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    ingest_outcomes_total: IntCounterVec,
    ingest_stages_total: IntCounterVec,
    fs_retries_total: IntCounterVec,
    quarantined_total: IntCounter,
    inflight_files: IntGauge,
    queue_depth: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Files currently claimed by pipeline workers.
    pub inflight_files: i64,
    /// Discovered files waiting for a worker.
    pub queue_depth: i64,
    /// Total sources moved aside into quarantine.
    pub quarantined_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors
    /// registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built
    /// or registered.
    pub fn new() -> Result<Self> {
        let ingest_outcomes_total = IntCounterVec::new(
            Opts::new(
                "ingest_outcomes_total",
                "Terminal pipeline outcomes by kind",
            ),
            &["outcome"],
        )
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "ingest_outcomes_total",
            source,
        })?;
        let ingest_stages_total = IntCounterVec::new(
            Opts::new("ingest_stages_total", "Pipeline stages executed by status"),
            &["stage", "status"],
        )
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "ingest_stages_total",
            source,
        })?;
        let fs_retries_total = IntCounterVec::new(
            Opts::new(
                "fs_retries_total",
                "Filesystem operation retries by operation",
            ),
            &["operation"],
        )
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "fs_retries_total",
            source,
        })?;
        let quarantined_total = IntCounter::with_opts(Opts::new(
            "quarantined_total",
            "Source files moved aside after unrecoverable deletion failures",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "quarantined_total",
            source,
        })?;
        let inflight_files = IntGauge::with_opts(Opts::new(
            "inflight_files",
            "Files currently claimed by pipeline workers",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "inflight_files",
            source,
        })?;
        let queue_depth = IntGauge::with_opts(Opts::new(
            "queue_depth",
            "Discovered files waiting for a worker",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "queue_depth",
            source,
        })?;

        let registry = Registry::new();
        register(&registry, ingest_outcomes_total.clone(), "ingest_outcomes_total")?;
        register(&registry, ingest_stages_total.clone(), "ingest_stages_total")?;
        register(&registry, fs_retries_total.clone(), "fs_retries_total")?;
        register(&registry, quarantined_total.clone(), "quarantined_total")?;
        register(&registry, inflight_files.clone(), "inflight_files")?;
        register(&registry, queue_depth.clone(), "queue_depth")?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                ingest_outcomes_total,
                ingest_stages_total,
                fs_retries_total,
                quarantined_total,
                inflight_files,
                queue_depth,
            }),
        })
    }

    /// Increment the terminal outcome counter.
    pub fn inc_outcome(&self, outcome: &str) {
        self.inner
            .ingest_outcomes_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Increment the pipeline stage counter.
    pub fn inc_stage(&self, stage: &str, status: &str) {
        self.inner
            .ingest_stages_total
            .with_label_values(&[stage, status])
            .inc();
    }

    /// Increment the retry counter for a filesystem operation.
    pub fn inc_retry(&self, operation: &str) {
        self.inner
            .fs_retries_total
            .with_label_values(&[operation])
            .inc();
    }

    /// Increment the quarantine counter.
    pub fn inc_quarantined(&self) {
        self.inner.quarantined_total.inc();
    }

    /// Set the in-flight file gauge.
    pub fn set_inflight(&self, count: i64) {
        self.inner.inflight_files.set(count);
    }

    /// Set the queue depth gauge.
    pub fn set_queue_depth(&self, depth: i64) {
        self.inner.queue_depth.set(depth);
    }

    /// Render the metrics registry using the Prometheus text exposition
    /// format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and
    /// counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            inflight_files: self.inner.inflight_files.get(),
            queue_depth: self.inner.queue_depth.get(),
            quarantined_total: self.inner.quarantined_total.get(),
        }
    }
}

fn register<C>(registry: &Registry, collector: C, name: &'static str) -> Result<()>
where
    C: prometheus::core::Collector + 'static,
{
    registry
        .register(Box::new(collector))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_rendered_output() {
        let metrics = Metrics::new().expect("metrics registry");
        metrics.inc_outcome("moved");
        metrics.inc_stage("stability", "completed");
        metrics.inc_retry("copy");
        metrics.set_inflight(3);

        let rendered = metrics.render().expect("render");
        assert!(rendered.contains("ingest_outcomes_total"));
        assert!(rendered.contains("fs_retries_total"));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.inflight_files, 3);
        assert_eq!(snapshot.quarantined_total, 0);
    }
}
