//! Hash calculation utilities.

use sha2::{Digest, Sha256};

/// SHA-256 helpers producing lowercase hex digests.
pub struct HashCalculator;

impl HashCalculator {
    /// Calculate SHA256 hash of bytes.
    pub fn sha256_bytes(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }
}
