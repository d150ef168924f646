use thiserror::Error;

/// Errors produced by the crypto helpers.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Input was not valid base64.
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Input was not valid hex.
    #[error("hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// A salt had the wrong length for the requested derivation.
    #[error("invalid salt length: expected {expected}, got {actual}")]
    InvalidSaltLength {
        /// Required salt length in bytes.
        expected: usize,
        /// Length of the salt actually supplied.
        actual: usize,
    },

    /// The auth protocol version does not have a supported password hashing
    /// scheme.
    #[error("unsupported auth protocol version: {0}")]
    UnsupportedAuthVersion(u8),

    /// The bcrypt password hash could not be computed.
    #[error("password hashing failed: {0}")]
    PasswordHashFailed(String),

    /// The system random generator failed.
    #[error("random generator failure: {0}")]
    Entropy(String),
}

/// Result alias for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
