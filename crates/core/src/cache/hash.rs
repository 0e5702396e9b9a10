//! Stable storage keys for cache entries.

use sha2::{Digest, Sha256};

/// Compute the storage key for a request identity.
///
/// The method is expected to be uppercased and the URL already canonical;
/// see [`RequestKey`](crate::request::RequestKey).
pub fn compute_entry_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
