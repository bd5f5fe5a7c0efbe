//! Content hashing for spool deduplication

use blake3;

/// Number of hex characters kept from the digest (64 bits).
pub const CONTENT_HASH_LEN: usize = 16;

/// Compute the content hash used in spool file names
///
/// BLAKE3 over the canonical payload bytes, truncated to
/// [`CONTENT_HASH_LEN`] lowercase hex characters.
pub fn content_hash(content: &[u8]) -> String {
    let hash = blake3::hash(content);
    let mut hex = hash.to_hex().to_string();
    hex.truncate(CONTENT_HASH_LEN);
    hex
}
