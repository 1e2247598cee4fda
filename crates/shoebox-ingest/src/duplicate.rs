//! Duplicate detection by size and checksum.
//!
//! A candidate is a duplicate only when a file with the same name already
//! sits at the destination, the sizes match, and (when enabled) the SHA-256
//! digests match. Any read failure degrades to "not a duplicate" so the
//! pipeline falls through to the collision-rename path instead of silently
//! dropping data.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, error};

/// Read buffer for checksum computation. Small relative to the copy buffer
/// since hashing is CPU-bound anyway.
const HASH_BUFFER_BYTES: usize = 64 * 1024;

/// Whether `destination` already holds a byte-identical copy of `source`.
///
/// The comparison runs on the blocking pool; checksums only run when the
/// sizes match and `verify_checksum` is set.
pub async fn is_duplicate(source: &Path, destination: &Path, verify_checksum: bool) -> bool {
    let source = source.to_path_buf();
    let destination = destination.to_path_buf();
    match tokio::task::spawn_blocking(move || check_duplicate(&source, &destination, verify_checksum))
        .await
    {
        Ok(result) => result,
        Err(err) => {
            error!(error = %err, "duplicate check task failed");
            false
        }
    }
}

fn check_duplicate(source: &Path, destination: &Path, verify_checksum: bool) -> bool {
    let Ok(destination_meta) = fs::metadata(destination) else {
        return false;
    };
    let Ok(source_meta) = fs::metadata(source) else {
        return false;
    };
    if !destination_meta.is_file() || destination_meta.len() != source_meta.len() {
        return false;
    }
    if !verify_checksum {
        return true;
    }
    match (sha256_of(source), sha256_of(destination)) {
        (Ok(source_digest), Ok(destination_digest)) => source_digest == destination_digest,
        (Err(err), _) | (_, Err(err)) => {
            debug!(error = %err, "checksum comparison failed; treating files as distinct");
            false
        }
    }
}

fn sha256_of(path: &Path) -> io::Result<[u8; 32]> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0_u8; HASH_BUFFER_BYTES];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn identical_files_are_duplicates() {
        let dir = TempDir::new().expect("temp dir");
        let source = dir.path().join("a.jpg");
        let destination = dir.path().join("b.jpg");
        std::fs::write(&source, b"same bytes").expect("write source");
        std::fs::write(&destination, b"same bytes").expect("write destination");

        assert!(is_duplicate(&source, &destination, true).await);
    }

    #[tokio::test]
    async fn same_size_different_content_is_caught_by_checksum() {
        let dir = TempDir::new().expect("temp dir");
        let source = dir.path().join("a.jpg");
        let destination = dir.path().join("b.jpg");
        std::fs::write(&source, b"payload-one").expect("write source");
        std::fs::write(&destination, b"payload-two").expect("write destination");

        assert!(!is_duplicate(&source, &destination, true).await);
        // Without checksum verification, matching sizes are trusted.
        assert!(is_duplicate(&source, &destination, false).await);
    }

    #[tokio::test]
    async fn missing_destination_is_not_a_duplicate() {
        let dir = TempDir::new().expect("temp dir");
        let source = dir.path().join("a.jpg");
        std::fs::write(&source, b"payload").expect("write source");

        assert!(!is_duplicate(&source, &dir.path().join("absent.jpg"), true).await);
    }
}
