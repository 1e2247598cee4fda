//! Error types for metadata extraction.
//!
//! These errors stay inside this crate: the public resolver logs them at
//! debug level and degrades to "no timestamp".

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while probing embedded metadata.
///
/// IO failures surface through the parser error; `nom-exif` wraps them.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The container could not be parsed.
    #[error("metadata parse failure")]
    Parse {
        /// Path of the unparseable file.
        path: PathBuf,
        /// Underlying parser error.
        source: nom_exif::Error,
    },
}
