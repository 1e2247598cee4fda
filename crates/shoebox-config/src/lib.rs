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

//! Typed ingestion settings for the Shoebox pipeline.
//!
//! Layout: `model.rs` (settings structs), `defaults.rs` (baseline constants),
//! `validate.rs` (validation applied before the pipeline boots).

/// Baseline constants shared between defaults and validation.
pub mod defaults;
/// Error types for configuration operations.
pub mod error;
/// Typed settings models.
pub mod model;
/// Settings validation helpers.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{IngestSettings, RetrySettings, StabilitySettings};
pub use validate::validate_settings;
