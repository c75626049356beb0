//! SHA-256 checksum utilities
//!
//! Provides a single canonical checksum format (`sha256:<hex>`) used to
//! fingerprint encoded file trees, so verify reports and export previews
//! can be compared across runs without comparing bytes file by file.

use sha2::{Digest, Sha256};

/// Prefix for all checksums produced by this module
const PREFIX: &str = "sha256:";

/// Compute one checksum over an ordered sequence of `(path, content)` pairs.
///
/// Each entry is framed with its path and length so that moving bytes
/// between files changes the result.
pub fn compute_tree_checksum<'a>(entries: impl IntoIterator<Item = (&'a str, &'a [u8])>) -> String {
    let mut hasher = Sha256::new();
    for (path, content) in entries {
        hasher.update(path.as_bytes());
        hasher.update([0u8]);
        hasher.update((content.len() as u64).to_le_bytes());
        hasher.update(content);
    }
    format!("{}{:x}", PREFIX, hasher.finalize())
}
