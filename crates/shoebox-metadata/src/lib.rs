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

//! Capture-time extraction for media files.
//!
//! The ingestion core consumes this crate through one capability: given a
//! file path, produce an optional capture timestamp. Extraction failures of
//! any kind degrade to "no timestamp" and never become pipeline errors.
//!
//! Layout: `kind.rs` (extension categories), `resolver.rs` (the per-category
//! strategy set), `error.rs` (internal extraction errors).

/// Internal extraction errors.
pub mod error;
/// Extension categories for supported media types.
pub mod kind;
/// Capture-time extraction strategies.
pub mod resolver;

pub use error::MetadataError;
pub use kind::MediaKind;
pub use resolver::{CaptureTimeResolver, resolve_capture_time};
