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

//! Core ingestion pipeline for the Shoebox archiver.
//!
//! # Design
//! - One claimed file flows through a fixed stage order: stability probe,
//!   capture-time classification, duplicate check, atomic move, and
//!   empty-directory pruning.
//! - Every terminal path releases the claim and emits exactly one outcome;
//!   failures are data, not panics.
//! - Blocking filesystem work (streamed copies, checksums, metadata parsing)
//!   runs on the blocking pool; async code only coordinates and sleeps.

/// Destination bucket resolution and collision-free naming.
pub mod classify;
/// The per-file pipeline state machine.
pub mod coordinator;
/// Initial scan and live watch dispatch over a bounded worker pool.
pub mod dispatcher;
/// Duplicate detection by size and checksum.
pub mod duplicate;
/// Error types for pipeline operations.
pub mod error;
/// Ignore rules and the media allow-list.
pub mod filter;
/// Shared pipeline data types.
pub mod model;
/// Atomic relocation with retries, fallback, and quarantine.
pub mod mover;
/// Empty-directory pruning under the watch root.
pub mod reaper;
/// In-flight and cool-down bookkeeping.
pub mod registry;
/// Retry/backoff policy shared by mutating filesystem operations.
pub mod retry;
/// Cooperative shutdown flag.
pub mod shutdown;
/// Mid-write detection via the adaptive stability probe.
pub mod stability;

pub use coordinator::IngestionCoordinator;
pub use dispatcher::{Dispatcher, ScanSummary};
pub use error::{IngestError, IngestResult};
pub use model::{DestinationBucket, IngestOutcome, IngestStage};
pub use mover::{AtomicMover, MoveResult, QUARANTINE_DIR_NAME};
pub use registry::{ClaimDecision, ProcessingRegistry};
pub use shutdown::StopFlag;
pub use stability::StabilityProbe;
