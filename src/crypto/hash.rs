//! Hash expansion used throughout the SRP protocol.
//!
//! The service derives every protocol-sized value (multiplier, scrambling
//! parameter, password exponent, session key, proofs) from a 2048-bit
//! expansion of SHA-512: the input is hashed four times with a one-byte
//! counter appended, and the digests are concatenated.

use sha2::{Digest, Sha512};

/// Length in bytes of an expanded hash (four SHA-512 digests).
pub const EXPANDED_HASH_BYTES: usize = 256;

/// Expand `data` to 256 bytes: `SHA512(data||0) || ... || SHA512(data||3)`.
pub fn expand_hash(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(EXPANDED_HASH_BYTES);
    for counter in 0u8..4 {
        let mut hasher = Sha512::new();
        hasher.update(data);
        hasher.update([counter]);
        out.extend_from_slice(&hasher.finalize());
    }
    out
}

/// Expand the concatenation of several byte slices.
///
/// Equivalent to [`expand_hash`] over `parts.concat()` without building the
/// intermediate buffer twice.
pub fn expand_hash_parts(parts: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(EXPANDED_HASH_BYTES);
    for counter in 0u8..4 {
        let mut hasher = Sha512::new();
        for part in parts {
            hasher.update(part);
        }
        hasher.update([counter]);
        out.extend_from_slice(&hasher.finalize());
    }
    out
}
