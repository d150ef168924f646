//! Client side of the SRP handshake.
//!
//! Given the server's auth parameters and the account password, this module
//! computes the client ephemeral and proof to submit, plus the server proof
//! the client expects back. Verifying that returned proof is what makes the
//! authentication mutual: a server that does not hold the password verifier
//! cannot produce it.
//!
//! All protocol integers are little-endian and padded to the 2048-bit
//! modulus size; every hash-derived value goes through the protocol's
//! SHA-512 expansion (see [`crate::crypto::hash`]).

use num_bigint::BigUint;
use num_traits::{One, Zero};
use subtle::ConstantTimeEq;

use super::error::{AuthError, Result};
use super::models::AuthParameters;
use super::modulus::{self, ModulusError, ModulusVerifier};
use crate::crypto::bigint::{self, MODULUS_BYTES};
use crate::crypto::hash::{expand_hash, expand_hash_parts};
use crate::crypto::{self, CryptoError, SecretVec, kdf};

/// Fixed protocol generator.
const GENERATOR: u32 = 2;

// Retry bound for the (astronomically unlikely) degenerate ephemeral draws.
const MAX_EPHEMERAL_ATTEMPTS: u32 = 16;

/// Outcome of the client-side proof computation for one handshake.
///
/// Holds the client ephemeral A and proof M1 to send to the server, and the
/// server proof M2 the client must receive back. Never reuse a value of this
/// type across two round-trips; every attempt draws a fresh ephemeral.
pub struct SrpProofs {
    client_ephemeral: Vec<u8>,
    client_proof: Vec<u8>,
    expected_server_proof: Vec<u8>,
}

impl SrpProofs {
    /// Client ephemeral A, little-endian padded bytes.
    pub fn client_ephemeral(&self) -> &[u8] {
        &self.client_ephemeral
    }

    /// Client proof M1.
    pub fn client_proof(&self) -> &[u8] {
        &self.client_proof
    }

    /// Client ephemeral A, base64 for the wire.
    pub fn client_ephemeral_b64(&self) -> String {
        crypto::encode_b64(&self.client_ephemeral)
    }

    /// Client proof M1, base64 for the wire.
    pub fn client_proof_b64(&self) -> String {
        crypto::encode_b64(&self.client_proof)
    }

    /// The server proof M2 this client expects.
    pub fn expected_server_proof(&self) -> &[u8] {
        &self.expected_server_proof
    }

    /// Check the server's proof against the expected value.
    ///
    /// See [`verify_server_proof`].
    pub fn verify_server_proof(&self, received: &[u8]) -> Result<()> {
        verify_server_proof(&self.expected_server_proof, received)
    }
}

/// Compute the client ephemeral, client proof and expected server proof for
/// one handshake attempt.
///
/// The modulus is verified through `verifier` and structurally validated
/// before any arithmetic. The computation follows the protocol exactly:
///
/// ```text
/// k = H(g || N)            x = H(bcrypt(password, salt) || N)
/// A = g^a mod N            u = H(A || B)
/// S = (B - k*g^x)^(a + u*x) mod N
/// K = H(S)    M1 = H(A || B || K)    M2 = H(A || M1 || K)
/// ```
///
/// where `H` is the SHA-512 expansion and `a` is a fresh 2048-bit secret
/// consumed by this call and never stored.
///
/// # Errors
/// [`AuthError::InvalidModulus`] when the modulus fails verification or
/// validation, [`AuthError::InvalidServerEphemeral`] when B reduces to zero
/// modulo N or the scrambling parameter u is zero. Both are mandatory
/// anti-tampering checks; without them a malicious server could complete the
/// handshake without knowing the verifier.
pub fn compute_proofs(
    password: &[u8],
    params: &AuthParameters,
    verifier: &impl ModulusVerifier,
) -> Result<SrpProofs> {
    let payload = verifier.verify_and_extract(&params.modulus).map_err(|e| {
        log::warn!("SRP modulus rejected ({e}); possible tampering");
        e
    })?;
    let n_bytes = modulus::decode_checked(&payload).map_err(|e| {
        log::warn!("SRP modulus rejected ({e}); possible tampering");
        e
    })?;
    let n = bigint::from_le(&n_bytes);
    let g = BigUint::from(GENERATOR);
    let g_bytes = bigint::to_le_padded(&g, MODULUS_BYTES);

    let k = bigint::from_le(&expand_hash_parts(&[&g_bytes, &n_bytes])) % &n;
    if k <= BigUint::one() {
        log::warn!("SRP modulus yields a degenerate multiplier; rejecting handshake");
        return Err(AuthError::InvalidModulus(ModulusError::WeakMultiplier));
    }

    let salt = crypto::decode_b64(&params.salt)?;
    let hashed_password: SecretVec =
        kdf::hash_password(password, &salt, &n_bytes, params.version)?;
    let x = bigint::from_le(&hashed_password);

    let b_bytes = crypto::decode_b64(&params.server_ephemeral)?;
    let b = bigint::from_le(&b_bytes) % &n;
    if b.is_zero() {
        log::warn!("server ephemeral is zero mod N; possible tampering");
        return Err(AuthError::InvalidServerEphemeral);
    }

    let n_minus_one = &n - 1u32;
    let (a_secret, a_bytes) = generate_client_ephemeral(&g, &n, &n_minus_one)?;

    let u = bigint::from_le(&expand_hash_parts(&[&a_bytes, &b_bytes]));
    if u.is_zero() {
        log::warn!("zero scrambling parameter; possible tampering");
        return Err(AuthError::InvalidServerEphemeral);
    }

    // S = (B - k*g^x)^(a + u*x) mod N, all arithmetic kept non-negative.
    let g_x = g.modpow(&x, &n);
    let k_g_x = (&k * &g_x) % &n;
    let base = ((&b + &n) - &k_g_x) % &n;
    let exponent = (&a_secret + &u * &x) % &n_minus_one;
    let shared = base.modpow(&exponent, &n);
    let shared_bytes: SecretVec =
        zeroize::Zeroizing::new(bigint::to_le_padded(&shared, MODULUS_BYTES));

    let session_key: SecretVec = zeroize::Zeroizing::new(expand_hash(&shared_bytes));
    let client_proof = expand_hash_parts(&[&a_bytes, &b_bytes, &session_key]);
    let expected_server_proof = expand_hash_parts(&[&a_bytes, &client_proof, &session_key]);

    Ok(SrpProofs {
        client_ephemeral: a_bytes,
        client_proof,
        expected_server_proof,
    })
}

/// Compare the received server proof against the expected one in constant
/// time.
///
/// The comparison covers every byte regardless of where the first difference
/// sits, so response timing reveals nothing about the expected proof.
///
/// # Errors
/// [`AuthError::ServerProofMismatch`] on any difference.
pub fn verify_server_proof(expected: &[u8], received: &[u8]) -> Result<()> {
    if bool::from(expected.ct_eq(received)) {
        Ok(())
    } else {
        Err(AuthError::ServerProofMismatch)
    }
}

/// Draw a fresh client secret `a` and compute the ephemeral A = g^a mod N.
///
/// Degenerate draws (a = 0 or A = 0 mod N) are redrawn; each handshake
/// attempt therefore always sends a distinct, valid ephemeral.
fn generate_client_ephemeral(
    g: &BigUint,
    n: &BigUint,
    n_minus_one: &BigUint,
) -> Result<(BigUint, Vec<u8>)> {
    for _ in 0..MAX_EPHEMERAL_ATTEMPTS {
        let a = bigint::from_le(&bigint::random_bytes(MODULUS_BYTES)?) % n_minus_one;
        if a.is_zero() {
            continue;
        }
        let a_pub = g.modpow(&a, n);
        if a_pub.is_zero() {
            continue;
        }
        let a_bytes = bigint::to_le_padded(&a_pub, MODULUS_BYTES);
        return Ok((a, a_bytes));
    }
    Err(AuthError::Crypto(CryptoError::Entropy(
        "could not draw a usable client ephemeral".into(),
    )))
}
