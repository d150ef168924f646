//! SRP authentication and key unlock.
//!
//! The login flow is a two-round-trip exchange:
//!
//! 1. Fetch the account's auth parameters (modulus, server ephemeral, salt,
//!    session id) through the transport collaborator.
//! 2. Compute the client ephemeral and proof from the password
//!    ([`compute_proofs`]), submit them, verify the server's counter-proof
//!    and collect the session credentials.
//!
//! A verified session can then decrypt the account's private key ring
//! ([`unlock`]), which commits the resulting identity into the client's
//! [`Session`] state.

mod error;
mod models;
mod modulus;
mod session;
mod srp;
mod unlock;

// Errors
pub use error::{AuthError, Result, TransportError};

// Wire DTOs and domain types
pub use models::{
    AuthInfoRequest, AuthInfoResponse, AuthParameters, AuthRequest, AuthResponse, PasswordMode,
    SessionCredentials,
};

// Modulus validation
pub use modulus::{ArmorOnly, ModulusError, ModulusVerifier, extract_cleartext};

// SRP proof engine
pub use srp::{SrpProofs, compute_proofs, verify_server_proof};

// Key unlock
pub use unlock::{KeyRing, KeyRingError, unlock};

// Session assembly
pub use session::{
    AuthClient, AuthFailure, AuthTransport, ClientConfig, Handshake, HandshakeState, Session,
    SessionIdentity,
};
