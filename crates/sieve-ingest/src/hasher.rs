//! Content fingerprinting.

use crate::error::HashError;
use sha2::{Digest, Sha256};
use sieve_core::Fingerprint;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Bytes read per iteration while hashing.
pub const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// SHA-256 of the file's bytes, streamed in fixed-size blocks.
///
/// The fingerprint depends on content only: renaming or touching a file does
/// not change it.
pub fn hash_file(path: &Path) -> Result<Fingerprint, HashError> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(HashError::NotFound(path.to_path_buf()))
        }
        Err(e) => {
            return Err(HashError::NotReadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    };

    if !metadata.is_file() {
        return Err(HashError::NotReadable {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }

    let mut file = File::open(path).map_err(|e| HashError::NotReadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];
    loop {
        let read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(HashError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        hasher.update(&buffer[..read]);
    }

    Ok(finish(hasher))
}

/// SHA-256 of in-memory content.
pub fn hash_bytes(bytes: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    finish(hasher)
}

fn finish(hasher: Sha256) -> Fingerprint {
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    Fingerprint::from_digest(digest)
}
