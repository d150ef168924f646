//! Big-integer codec helpers for the SRP handshake.
//!
//! The service transmits all protocol integers as **little-endian** byte
//! sequences padded to the modulus size, base64-encoded on the wire. These
//! helpers convert between that representation and [`BigUint`], and source
//! the entropy for ephemeral secrets.

use num_bigint::BigUint;

use super::{CryptoError, Result};

/// Size in bytes of the 2048-bit SRP modulus and of every padded protocol
/// integer.
pub const MODULUS_BYTES: usize = 256;

/// Interpret little-endian bytes as an unsigned big integer.
pub fn from_le(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_le(bytes)
}

/// Serialize a big integer as little-endian bytes padded with trailing
/// zeros to `len`.
///
/// The value must already fit in `len` bytes; protocol integers are reduced
/// modulo N before serialization.
pub fn to_le_padded(value: &BigUint, len: usize) -> Vec<u8> {
    let mut bytes = value.to_bytes_le();
    debug_assert!(bytes.len() <= len, "value exceeds {len} bytes");
    bytes.resize(len, 0);
    bytes
}

/// Fill a fresh buffer of `len` bytes from the system random generator.
pub fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; len];
    getrandom::getrandom(&mut bytes).map_err(|e| CryptoError::Entropy(e.to_string()))?;
    Ok(bytes)
}
