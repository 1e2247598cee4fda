#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Telemetry primitives shared across the Shoebox workspace.
//!
//! Centralises logging setup and the metrics registry so every crate adopts
//! a consistent observability story.

/// Error types for telemetry operations.
pub mod error;
/// Tracing subscriber installation.
pub mod init;
/// Prometheus-backed metrics registry.
pub mod metrics;

pub use error::{Result, TelemetryError};
pub use init::{LogFormat, LoggingConfig, build_sha, init_logging};
pub use metrics::{Metrics, MetricsSnapshot};
