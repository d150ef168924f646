//! Handling of the server-supplied SRP modulus.
//!
//! The modulus arrives as a PGP clear-signed message so that a compromised
//! transport cannot substitute a weak prime. This module extracts the
//! cleartext payload from the armor and performs the structural checks the
//! protocol requires of every modulus; cryptographic verification of the
//! signature itself is delegated to the [`ModulusVerifier`] collaborator,
//! since OpenPGP is an external capability.

use thiserror::Error;

use crate::crypto::{self, bigint::MODULUS_BYTES};

const BEGIN_SIGNED_MESSAGE: &str = "-----BEGIN PGP SIGNED MESSAGE-----";
const BEGIN_SIGNATURE: &str = "-----BEGIN PGP SIGNATURE-----";

/// Reasons a server-supplied modulus is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModulusError {
    /// The payload is not a PGP clear-signed message.
    #[error("not a clear-signed message")]
    BadArmor,

    /// The signature over the modulus did not verify.
    #[error("signature rejected")]
    BadSignature,

    /// The cleartext payload is not valid base64.
    #[error("payload is not valid base64")]
    BadEncoding,

    /// The decoded modulus has the wrong size.
    #[error("decoded to {0} bytes, expected {MODULUS_BYTES}")]
    WrongSize(usize),

    /// The high bit is clear, so the modulus is below 2048 bits.
    #[error("modulus is below 2048 bits")]
    TooSmall,

    /// The derived multiplier parameter is degenerate (k <= 1 mod N).
    #[error("degenerate multiplier parameter")]
    WeakMultiplier,
}

/// Verifies the signature over the clear-signed modulus and returns the
/// cleartext payload.
///
/// Production implementations check the signature against the service's
/// pinned modulus signing key using an OpenPGP backend and return
/// [`ModulusError::BadSignature`] on any mismatch.
pub trait ModulusVerifier {
    /// Verify `armored` and extract the base64 modulus payload.
    fn verify_and_extract(&self, armored: &str) -> Result<String, ModulusError>;
}

/// Armor-structure-only verifier: extracts the payload without checking the
/// signature.
///
/// Only suitable when modulus authenticity is established elsewhere, for
/// example against a pinned copy, or in tests. It still rejects payloads
/// that are not clear-signed messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArmorOnly;

impl ModulusVerifier for ArmorOnly {
    fn verify_and_extract(&self, armored: &str) -> Result<String, ModulusError> {
        extract_cleartext(armored)
    }
}

/// Extract the cleartext payload of a PGP clear-signed message.
///
/// Armor headers after the begin line are skipped up to the first blank
/// line; the payload runs until the signature block. The payload is joined
/// with line breaks stripped, since the modulus is a single base64 value.
pub fn extract_cleartext(armored: &str) -> Result<String, ModulusError> {
    let start = armored.find(BEGIN_SIGNED_MESSAGE).ok_or(ModulusError::BadArmor)?;
    let after_header = &armored[start + BEGIN_SIGNED_MESSAGE.len()..];

    let mut payload = String::new();
    let mut in_payload = false;
    // skip(1) drops the remainder of the begin-marker line; only a blank
    // line after it separates the armor headers from the payload.
    for line in after_header.lines().skip(1) {
        let trimmed = line.trim();
        if !in_payload {
            // Armor headers such as "Hash: SHA256" end at the first blank line.
            if trimmed.is_empty() {
                in_payload = true;
            }
            continue;
        }
        if trimmed.starts_with(BEGIN_SIGNATURE) {
            if payload.is_empty() {
                return Err(ModulusError::BadArmor);
            }
            return Ok(payload);
        }
        payload.push_str(trimmed);
    }

    // Never reached the signature block.
    Err(ModulusError::BadArmor)
}

/// Decode a base64 modulus payload and validate its shape.
///
/// The decoded value must be exactly [`MODULUS_BYTES`] long with its high
/// bit set, so that the modulus is a full 2048-bit value. Anything else is
/// rejected before any arithmetic happens.
pub fn decode_checked(payload: &str) -> Result<Vec<u8>, ModulusError> {
    let bytes = crypto::decode_b64(payload.trim()).map_err(|_| ModulusError::BadEncoding)?;
    if bytes.len() != MODULUS_BYTES {
        return Err(ModulusError::WrongSize(bytes.len()));
    }
    // Little-endian: the top bit lives in the final byte.
    if bytes[MODULUS_BYTES - 1] & 0x80 == 0 {
        return Err(ModulusError::TooSmall);
    }
    Ok(bytes)
}
