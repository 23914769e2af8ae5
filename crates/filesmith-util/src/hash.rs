//! Content hashing.

use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Compute the SHA-256 hash of file content as a lowercase hex string.
///
/// The hash is a pure function of the bytes, so the hash of a committed file
/// always equals the hash recomputed by re-reading it.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();

    let mut hex = String::with_capacity(64);
    for b in digest.iter() {
        let _ = write!(hex, "{b:02x}");
    }
    hex
}
