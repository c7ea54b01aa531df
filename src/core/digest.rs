//! Content digests used as integrity anchors.
//!
//! The algorithm is BLAKE3 with the default 32-byte output, rendered as 64
//! lowercase hex characters. Every replica must use the same algorithm:
//! stored `DataHash` values are compared byte for byte.

use blake3::Hasher;

/// Length of a rendered digest in characters.
pub const DIGEST_HEX_LEN: usize = 64;

pub fn digest_hex(data: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize().to_hex().to_string()
}
