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

//! Application shell for the Shoebox media archiver: CLI parsing, startup
//! checks, and the scan/watch lifecycle.

/// Startup sequence and the scan/watch lifecycle.
pub mod bootstrap;
/// Command-line interface.
pub mod cli;
/// Application-level error types.
pub mod error;

pub use bootstrap::{run_app, run_with};
pub use cli::Cli;
pub use error::{AppError, AppResult};
