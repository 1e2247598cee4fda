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

//! Filesystem watch source for the ingestion pipeline.
//!
//! Bridges a platform watcher into a tokio channel of discovery events. The
//! pipeline only cares about paths that may now contain a complete file, so
//! creations and the destination side of renames are surfaced; everything
//! else is dropped at this boundary.

/// Error types for watch operations.
pub mod error;
/// The notify-backed watch source.
pub mod source;

pub use error::{WatchError, WatchResult};
pub use source::{DiscoveryEvent, DiscoveryKind, WatchSource};
