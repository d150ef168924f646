//! Cryptographic building blocks for the SRP handshake and key unlock.
//!
//! Everything in here is a pure transform over byte inputs; network and
//! OpenPGP concerns live elsewhere.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

mod error;

pub mod bigint;
pub mod hash;
pub mod kdf;

pub use error::{CryptoError, Result};

/// A heap-allocated byte buffer that is **zeroized on drop**.
///
/// Prefer this type for sensitive key material that should not remain in
/// memory after it goes out of scope.
pub type SecretVec = zeroize::Zeroizing<Vec<u8>>;

/// Decode a base64 string to bytes.
///
/// # Arguments
/// * `input` - Base64 encoded string.
///
/// # Returns
/// The decoded bytes.
pub fn decode_b64(input: &str) -> Result<Vec<u8>> {
    Ok(BASE64.decode(input)?)
}

/// Encode bytes to a base64 string (standard alphabet, RFC 4648 §4).
pub fn encode_b64(input: &[u8]) -> String {
    BASE64.encode(input)
}

/// Decode a hex string to bytes.
pub fn decode_hex(input: &str) -> Result<Vec<u8>> {
    Ok(hex::decode(input)?)
}

/// Encode bytes to a hex string (lowercase).
pub fn encode_hex(input: &[u8]) -> String {
    hex::encode(input)
}
