//! Client-side authentication for an end-to-end encrypted mail service.
//!
//! This crate implements the client half of the service's SRP (Secure Remote
//! Password) login protocol and the password-derived unlock of the account's
//! encrypted private key ring. The password itself never leaves the client;
//! the server and client instead exchange zero-knowledge proofs derived from
//! a shared session secret, and each side verifies the other's proof.
//!
//! ## Login flow
//!
//! ```ignore
//! let client = AuthClient::new(config, transport, modulus_verifier);
//!
//! // Single-password account: authenticate and unlock in one call.
//! let key_ring = client.login("user@example.com", password, None)?;
//!
//! // Two-password account: authenticate with the login password, then
//! // unlock with the mailbox password.
//! let creds = client.auth("user@example.com", login_password, None, None)?;
//! let key_ring = client.unlock(&creds, mailbox_password)?;
//! ```
//!
//! HTTP transport and OpenPGP key-ring primitives are not part of this crate;
//! they are consumed through the [`auth::AuthTransport`], [`auth::KeyRing`]
//! and [`auth::ModulusVerifier`] traits.

pub mod auth;
pub mod crypto;
