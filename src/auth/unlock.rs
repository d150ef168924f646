//! Unlock of the account's encrypted private key ring.
//!
//! After a successful handshake the session carries the armored, encrypted
//! key ring and (for single-password accounts) the salt of the mailbox
//! passphrase derivation. This module turns the password into the right
//! passphrase and runs it against every entry of the ring. It is a pure
//! transform; committing the unlocked ring to session state is the
//! caller's job.

use thiserror::Error;

use super::error::{AuthError, Result};
use super::models::{PasswordMode, SessionCredentials};
use crate::crypto::{self, SecretVec, kdf};

/// Failure reported by the key-ring collaborator.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct KeyRingError(pub String);

impl KeyRingError {
    /// Wrap any key-ring-level failure.
    pub fn new(message: impl Into<String>) -> Self {
        KeyRingError(message.into())
    }
}

/// External OpenPGP key-ring capability.
///
/// Implementations wrap whatever OpenPGP backend the application uses; this
/// crate treats parsing and per-entry decryption as opaque operations.
pub trait KeyRing: Sized {
    /// Parse an armored key ring.
    fn parse_armored(armored: &str) -> std::result::Result<Self, KeyRingError>;

    /// Number of entries in the ring.
    fn entry_count(&self) -> usize;

    /// Decrypt every entry with the given passphrase, failing on the first
    /// entry that rejects it.
    fn decrypt_entries(&mut self, passphrase: &[u8]) -> std::result::Result<(), KeyRingError>;
}

/// Decrypt the session's private key ring with the account password.
///
/// For [`PasswordMode::Single`] accounts the mailbox passphrase is first
/// derived from the password and the session's key salt; for
/// [`PasswordMode::Two`] accounts the supplied password is expected to be
/// the mailbox password and is used as is.
///
/// Either the whole ring unlocks or the operation fails; there is no
/// partial-success state.
///
/// # Errors
/// [`AuthError::MalformedKeyRing`] when the ring cannot be parsed or has no
/// entries, [`AuthError::DecryptionFailed`] when an entry rejects the
/// passphrase (typically a wrong password; the credentials stay valid and
/// unlock may be retried).
pub fn unlock<K: KeyRing>(credentials: &SessionCredentials, password: &[u8]) -> Result<K> {
    let passphrase: SecretVec = match credentials.password_mode {
        PasswordMode::Single => {
            let key_salt = crypto::decode_b64(&credentials.key_salt)?;
            kdf::compute_key_password(password, &key_salt)?
        }
        PasswordMode::Two => zeroize::Zeroizing::new(password.to_vec()),
    };

    let mut ring = K::parse_armored(&credentials.encrypted_private_key)
        .map_err(|e| AuthError::MalformedKeyRing(e.to_string()))?;
    if ring.entry_count() == 0 {
        return Err(AuthError::MalformedKeyRing("key ring is empty".into()));
    }

    ring.decrypt_entries(&passphrase)
        .map_err(|e| AuthError::DecryptionFailed(e.to_string()))?;
    Ok(ring)
}
