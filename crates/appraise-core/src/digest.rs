//! Content change detection.
//!
//! Resources are monitored by fingerprint, not by history: the store keeps
//! the digest of the last-seen content, and a resource has drifted exactly
//! when the digest of freshly fetched content differs from the stored one.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the UTF-8 bytes of `content`.
///
/// Deterministic across runs and platforms for the same byte sequence.
pub fn digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// True when `new_content` no longer matches the stored digest.
pub fn has_changed(stored_digest: &str, new_content: &str) -> bool {
    digest(new_content) != stored_digest
}
