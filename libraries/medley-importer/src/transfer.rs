//! File hashing and transfer into the managed library
//!
//! - SHA-256 content hashing for duplicate detection
//! - Copy with hash verification
//! - Move via rename, falling back to verified copy + delete
//! - Pruning of directories left empty by a move

use crate::{ImportError, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::UNIX_EPOCH;
use tracing::debug;

/// Default buffer size for file operations (64KB)
const BUFFER_SIZE: usize = 64 * 1024;

/// Compute the SHA-256 hash of a file, hex encoded
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Whether two files have identical content
pub fn same_content(a: &Path, b: &Path) -> Result<bool> {
    if fs::metadata(a)?.len() != fs::metadata(b)?.len() {
        return Ok(false);
    }
    Ok(compute_file_hash(a)? == compute_file_hash(b)?)
}

/// Copy a file, refusing to overwrite, with optional hash verification
pub fn copy_file_verified(source: &Path, dest: &Path, verify: bool) -> Result<()> {
    if dest.exists() {
        return Err(ImportError::InvalidPath(format!(
            "{} already exists",
            dest.display()
        )));
    }

    let source_hash = if verify {
        Some(compute_file_hash(source)?)
    } else {
        None
    };

    fs::copy(source, dest)?;

    if let Some(expected_hash) = source_hash {
        let actual_hash = compute_file_hash(dest)?;
        if expected_hash != actual_hash {
            // Never leave a corrupt copy behind
            let _ = fs::remove_file(dest);
            return Err(ImportError::VerificationFailed(format!(
                "hash mismatch for {}",
                dest.display()
            )));
        }
        debug!("File verification passed: {:?}", dest);
    }

    Ok(())
}

/// Move a file, falling back to a verified copy across filesystems
///
/// If the copy succeeds but the source cannot be removed, the error is
/// returned and both files exist.
pub fn move_file(source: &Path, dest: &Path) -> Result<()> {
    if dest.exists() {
        return Err(ImportError::InvalidPath(format!(
            "{} already exists",
            dest.display()
        )));
    }

    if fs::rename(source, dest).is_ok() {
        return Ok(());
    }

    copy_file_verified(source, dest, true)?;
    fs::remove_file(source)?;

    Ok(())
}

/// Remove `start` and its ancestors while they are empty
///
/// Stops at the first non-empty directory and never removes `root` or
/// anything outside it.
pub fn remove_empty_ancestors(start: &Path, root: &Path) {
    let mut current = Some(start);

    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) {
            break;
        }

        // remove_dir only succeeds on empty directories
        match fs::remove_dir(dir) {
            Ok(()) => {
                tracing::info!("Cleaned up empty directory: {}", dir.display());
                current = dir.parent();
            }
            Err(_) => break,
        }
    }
}

/// File modification time in seconds since the Unix epoch
pub fn modified_seconds(path: &Path) -> Result<i64> {
    let modified = fs::metadata(path)?.modified()?;
    let seconds = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    Ok(seconds)
}
