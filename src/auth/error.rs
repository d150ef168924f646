use thiserror::Error;

use super::modulus::ModulusError;
use crate::crypto::CryptoError;

/// Failure reported by the HTTP transport collaborator.
///
/// Network and JSON failures are surfaced verbatim and never retried by this
/// layer.
#[derive(Debug, Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

impl TransportError {
    /// Wrap any transport-level failure.
    pub fn new(message: impl Into<String>) -> Self {
        TransportError(message.into())
    }
}

/// Errors produced during authentication and key unlock.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The transport collaborator failed; nothing was verified.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server-supplied modulus failed validation. Fatal to the attempt;
    /// treat as a possible attack indicator.
    #[error("invalid SRP modulus: {0}")]
    InvalidModulus(#[from] ModulusError),

    /// The server ephemeral reduced to zero modulo N, or produced a zero
    /// scrambling parameter. Fatal to the attempt; treat as a possible
    /// attack indicator.
    #[error("invalid server ephemeral")]
    InvalidServerEphemeral,

    /// The server's proof did not match the expected value, so the server
    /// does not know the password verifier. Any retry needs a fresh
    /// handshake.
    #[error("server proof mismatch")]
    ServerProofMismatch,

    /// The encrypted key ring could not be parsed or contained no entries.
    #[error("malformed key ring: {0}")]
    MalformedKeyRing(String),

    /// A key ring entry rejected the derived passphrase, which usually means
    /// a wrong password. The session credentials remain valid; unlock may be
    /// retried without a new handshake.
    #[error("private key decryption failed: {0}")]
    DecryptionFailed(String),

    /// A crypto helper failed (decoding, key derivation, entropy).
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Result alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;
