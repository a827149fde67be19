//! Stable content hash of a topology.
//!
//! The hash covers a set of canonical lines, so the order in which the lines
//! are produced does not matter. Callers put everything that identifies the
//! topology into the lines, node ids included. Partition caches key on this
//! instead of object identity.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 over the sorted, newline-joined `lines`.
pub fn fingerprint<I>(lines: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut lines: Vec<String> = lines.into_iter().collect();
    lines.sort();
    let mut hasher = Sha256::new();
    for line in &lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
