//! Password key derivation.
//!
//! Two bcrypt-based derivations are used by the service:
//!
//! - the SRP password hash, which feeds the client's secret exponent `x`
//!   during the handshake, salted with the per-account auth salt;
//! - the mailbox passphrase, which decrypts the account's private key ring,
//!   salted with the per-key salt.

use zeroize::Zeroizing;

use super::hash::expand_hash_parts;
use super::{CryptoError, Result, SecretVec};

/// bcrypt work factor used by both derivations.
const BCRYPT_COST: u32 = 10;

/// Length of the decoded per-account auth salt.
pub const AUTH_SALT_BYTES: usize = 10;

/// Length of the decoded per-key salt.
pub const KEY_SALT_BYTES: usize = 16;

/// Length of a derived mailbox passphrase (the radix-64 section of a bcrypt
/// hash).
pub const KEY_PASSWORD_BYTES: usize = 31;

// The auth salt is padded to bcrypt's 16 salt bytes with a fixed domain tag.
const AUTH_SALT_SUFFIX: &[u8] = b"proton";

/// Hash a login password for the SRP exchange.
///
/// Protocol versions 3 and 4 share the current scheme: the password is run
/// through bcrypt (cost 10) with the auth salt extended by a fixed suffix,
/// and the resulting hash string is expanded together with the modulus to a
/// 256-byte value. The caller interprets that value as the secret exponent
/// `x`. Older versions used weaker schemes that the service no longer
/// accepts; they are rejected here.
///
/// # Arguments
/// * `password` - The login password bytes.
/// * `salt` - The decoded auth salt (10 bytes).
/// * `modulus` - The decoded SRP modulus (little-endian bytes).
/// * `version` - Auth protocol version from the server.
///
/// # Returns
/// A 256-byte hashed password, zeroized on drop.
pub fn hash_password(
    password: &[u8],
    salt: &[u8],
    modulus: &[u8],
    version: u8,
) -> Result<SecretVec> {
    match version {
        3 | 4 => hash_password_bcrypt(password, salt, modulus),
        other => Err(CryptoError::UnsupportedAuthVersion(other)),
    }
}

fn hash_password_bcrypt(password: &[u8], salt: &[u8], modulus: &[u8]) -> Result<SecretVec> {
    if salt.len() != AUTH_SALT_BYTES {
        return Err(CryptoError::InvalidSaltLength {
            expected: AUTH_SALT_BYTES,
            actual: salt.len(),
        });
    }

    let mut bcrypt_salt = [0u8; 16];
    bcrypt_salt[..AUTH_SALT_BYTES].copy_from_slice(salt);
    bcrypt_salt[AUTH_SALT_BYTES..].copy_from_slice(AUTH_SALT_SUFFIX);

    let parts = bcrypt::hash_with_salt(password, BCRYPT_COST, bcrypt_salt)
        .map_err(|e| CryptoError::PasswordHashFailed(e.to_string()))?;
    let hashed = Zeroizing::new(parts.format_for_version(bcrypt::Version::TwoY));

    Ok(Zeroizing::new(expand_hash_parts(&[
        hashed.as_bytes(),
        modulus,
    ])))
}

/// Derive the mailbox passphrase from a password and key salt.
///
/// Single-password accounts store their key ring encrypted under this derived
/// value rather than the raw login password. The passphrase is the radix-64
/// hash section of `bcrypt(password, key_salt)`, i.e. the last 31 characters
/// of the bcrypt hash string.
///
/// # Arguments
/// * `password` - The account password bytes.
/// * `key_salt` - The decoded key salt (16 bytes).
///
/// # Returns
/// A 31-byte passphrase, zeroized on drop.
pub fn compute_key_password(password: &[u8], key_salt: &[u8]) -> Result<SecretVec> {
    if key_salt.len() != KEY_SALT_BYTES {
        return Err(CryptoError::InvalidSaltLength {
            expected: KEY_SALT_BYTES,
            actual: key_salt.len(),
        });
    }

    let mut bcrypt_salt = [0u8; 16];
    bcrypt_salt.copy_from_slice(key_salt);

    let parts = bcrypt::hash_with_salt(password, BCRYPT_COST, bcrypt_salt)
        .map_err(|e| CryptoError::PasswordHashFailed(e.to_string()))?;
    let hashed = Zeroizing::new(parts.format_for_version(bcrypt::Version::TwoY));

    // The hash section is the last 31 characters; everything before it is
    // the version/cost/salt prefix.
    let section_start = hashed.len() - KEY_PASSWORD_BYTES;
    Ok(Zeroizing::new(hashed[section_start..].as_bytes().to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULUS: &[u8] = &[0x42u8; 32];

    #[test]
    fn test_hash_password_deterministic() {
        let salt = [7u8; AUTH_SALT_BYTES];
        let hashed = hash_password(b"password", &salt, MODULUS, 4).unwrap();
        assert_eq!(hashed.len(), 256);

        let again = hash_password(b"password", &salt, MODULUS, 4).unwrap();
        assert_eq!(*hashed, *again);
    }

    #[test]
    fn test_hash_password_versions_3_and_4_agree() {
        let salt = [7u8; AUTH_SALT_BYTES];
        let v3 = hash_password(b"password", &salt, MODULUS, 3).unwrap();
        let v4 = hash_password(b"password", &salt, MODULUS, 4).unwrap();
        assert_eq!(*v3, *v4);
    }

    #[test]
    fn test_hash_password_sensitive_to_inputs() {
        let salt = [7u8; AUTH_SALT_BYTES];
        let base = hash_password(b"password", &salt, MODULUS, 4).unwrap();

        let other_password = hash_password(b"passwore", &salt, MODULUS, 4).unwrap();
        assert_ne!(*base, *other_password);

        let other_salt = hash_password(b"password", &[8u8; AUTH_SALT_BYTES], MODULUS, 4).unwrap();
        assert_ne!(*base, *other_salt);

        let other_modulus = hash_password(b"password", &salt, &[0x43u8; 32], 4).unwrap();
        assert_ne!(*base, *other_modulus);
    }

    #[test]
    fn test_hash_password_rejects_legacy_versions() {
        let salt = [7u8; AUTH_SALT_BYTES];
        for version in [0u8, 1, 2, 5] {
            let result = hash_password(b"password", &salt, MODULUS, version);
            assert!(matches!(
                result,
                Err(CryptoError::UnsupportedAuthVersion(v)) if v == version
            ));
        }
    }

    #[test]
    fn test_hash_password_rejects_bad_salt_length() {
        let result = hash_password(b"password", &[0u8; 16], MODULUS, 4);
        assert!(matches!(
            result,
            Err(CryptoError::InvalidSaltLength { expected: AUTH_SALT_BYTES, actual: 16 })
        ));
    }

    #[test]
    fn test_compute_key_password() {
        let key_salt = [3u8; KEY_SALT_BYTES];
        let passphrase = compute_key_password(b"mailbox password", &key_salt).unwrap();
        assert_eq!(passphrase.len(), KEY_PASSWORD_BYTES);

        let again = compute_key_password(b"mailbox password", &key_salt).unwrap();
        assert_eq!(*passphrase, *again);

        let other = compute_key_password(b"mailbox passworD", &key_salt).unwrap();
        assert_ne!(*passphrase, *other);
    }

    #[test]
    fn test_compute_key_password_is_bcrypt_hash_section() {
        let key_salt = [3u8; KEY_SALT_BYTES];
        let passphrase = compute_key_password(b"mailbox password", &key_salt).unwrap();

        // The version/cost/salt prefix must not leak into the passphrase.
        assert!(!passphrase.contains(&b'$'));

        let full = bcrypt::hash_with_salt(b"mailbox password", 10, key_salt)
            .unwrap()
            .format_for_version(bcrypt::Version::TwoY);
        assert_eq!(*passphrase, full.as_bytes()[full.len() - KEY_PASSWORD_BYTES..]);
    }

    #[test]
    fn test_compute_key_password_rejects_bad_salt_length() {
        let result = compute_key_password(b"password", &[0u8; 10]);
        assert!(matches!(
            result,
            Err(CryptoError::InvalidSaltLength { expected: KEY_SALT_BYTES, actual: 10 })
        ));
    }
}
