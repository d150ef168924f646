//! Wire DTOs and domain types for the authentication flow.
//!
//! The serde structs mirror the service's JSON field names exactly and exist
//! only at the transport boundary. Long-lived domain values
//! ([`AuthParameters`], [`SessionCredentials`]) are built from them through
//! explicit mapping functions so that raw protocol fields never leak onto
//! the types the rest of the crate passes around.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Request body for the auth parameter fetch (`POST /auth/info`).
#[derive(Debug, Clone, Serialize)]
pub struct AuthInfoRequest {
    /// Registered client identifier.
    #[serde(rename = "ClientID")]
    pub client_id: String,
    /// Registered client secret.
    #[serde(rename = "ClientSecret")]
    pub client_secret: String,
    /// Account username.
    #[serde(rename = "Username")]
    pub username: String,
}

/// Response body for the auth parameter fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthInfoResponse {
    /// Auth protocol version.
    #[serde(rename = "Version")]
    pub version: u8,
    /// PGP clear-signed armored modulus.
    #[serde(rename = "Modulus")]
    pub modulus: String,
    /// Base64 server ephemeral B.
    #[serde(rename = "ServerEphemeral")]
    pub server_ephemeral: String,
    /// Base64 auth salt.
    #[serde(rename = "Salt")]
    pub salt: String,
    /// Opaque SRP session identifier.
    #[serde(rename = "SRPSession")]
    pub srp_session: String,
    /// Non-zero when the account has a second factor enabled.
    #[serde(rename = "TwoFactor", default)]
    pub two_factor: u8,
}

/// Request body for the proof submission (`POST /auth`).
#[derive(Debug, Clone, Serialize)]
pub struct AuthRequest {
    /// Registered client identifier.
    #[serde(rename = "ClientID")]
    pub client_id: String,
    /// Registered client secret.
    #[serde(rename = "ClientSecret")]
    pub client_secret: String,
    /// Account username.
    #[serde(rename = "Username")]
    pub username: String,
    /// SRP session identifier from the parameter fetch.
    #[serde(rename = "SRPSession")]
    pub srp_session: String,
    /// Base64 client ephemeral A.
    #[serde(rename = "ClientEphemeral")]
    pub client_ephemeral: String,
    /// Base64 client proof M1.
    #[serde(rename = "ClientProof")]
    pub client_proof: String,
    /// Second-factor code, passed through untouched.
    #[serde(rename = "TwoFactorCode", skip_serializing_if = "String::is_empty")]
    pub two_factor_code: String,
}

/// Response body for a successful proof submission.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    /// Bearer token for subsequent API calls.
    #[serde(rename = "AccessToken")]
    pub access_token: String,
    /// Token type, normally `Bearer`.
    #[serde(rename = "TokenType", default)]
    pub token_type: String,
    /// Token lifetime in seconds.
    #[serde(rename = "ExpiresIn")]
    pub expires_in: u64,
    /// Granted scopes.
    #[serde(rename = "Scope", default)]
    pub scope: String,
    /// Session user identifier.
    #[serde(rename = "Uid")]
    pub uid: String,
    /// Token used to refresh the session.
    #[serde(rename = "RefreshToken")]
    pub refresh_token: String,
    /// Latest event stream position.
    #[serde(rename = "EventID", default)]
    pub event_id: String,
    /// Whether the account uses one or two passwords.
    #[serde(rename = "PasswordMode")]
    pub password_mode: PasswordMode,
    /// Base64 server proof M2.
    #[serde(rename = "ServerProof")]
    pub server_proof: String,
    /// Armored encrypted private key ring.
    #[serde(rename = "PrivateKey")]
    pub private_key: String,
    /// Base64 key salt for the mailbox passphrase derivation.
    #[serde(rename = "KeySalt", default)]
    pub key_salt: String,
}

/// Whether the account uses a single password for both login and mailbox, or
/// two distinct ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PasswordMode {
    /// One password; the mailbox passphrase is derived from it with the key
    /// salt.
    Single,
    /// Two passwords; the mailbox password is used as supplied.
    Two,
}

impl TryFrom<u8> for PasswordMode {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(PasswordMode::Single),
            2 => Ok(PasswordMode::Two),
            other => Err(format!("unknown password mode {other}")),
        }
    }
}

impl From<PasswordMode> for u8 {
    fn from(mode: PasswordMode) -> Self {
        match mode {
            PasswordMode::Single => 1,
            PasswordMode::Two => 2,
        }
    }
}

/// Auth parameters for one handshake attempt.
///
/// Immutable once fetched and consumed exactly once; a failed proof
/// submission requires a fresh fetch.
#[derive(Debug, Clone)]
pub struct AuthParameters {
    /// Auth protocol version.
    pub version: u8,
    /// PGP clear-signed armored modulus.
    pub modulus: String,
    /// Base64 server ephemeral B.
    pub server_ephemeral: String,
    /// Base64 auth salt.
    pub salt: String,
    /// Opaque SRP session identifier, echoed back on proof submission.
    pub session_id: String,
    /// Whether a second-factor code must accompany the proof.
    pub two_factor_enabled: bool,
}

impl AuthParameters {
    /// Build handshake parameters from the transport response.
    pub fn from_response(resp: AuthInfoResponse) -> Self {
        AuthParameters {
            version: resp.version,
            modulus: resp.modulus,
            server_ephemeral: resp.server_ephemeral,
            salt: resp.salt,
            session_id: resp.srp_session,
            two_factor_enabled: resp.two_factor != 0,
        }
    }
}

/// Credentials of an authenticated session.
///
/// Produced by a successful handshake after the server proof has been
/// verified; never mutated, only replaced on refresh.
#[derive(Clone)]
pub struct SessionCredentials {
    /// Bearer token for subsequent API calls.
    pub access_token: String,
    /// Token used to refresh the session.
    pub refresh_token: String,
    /// Session user identifier.
    pub user_id: String,
    /// Token lifetime.
    pub expires_in: Duration,
    /// Granted scopes.
    pub scope: String,
    /// Latest event stream position.
    pub event_id: String,
    /// Whether the account uses one or two passwords.
    pub password_mode: PasswordMode,
    /// Armored encrypted private key ring.
    pub encrypted_private_key: String,
    /// Base64 key salt for the mailbox passphrase derivation.
    pub key_salt: String,
}

impl SessionCredentials {
    /// Build session credentials from the transport response.
    ///
    /// The server proof is consumed separately during verification and is
    /// deliberately absent here.
    pub fn from_response(resp: AuthResponse) -> Self {
        SessionCredentials {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            user_id: resp.uid,
            expires_in: Duration::from_secs(resp.expires_in),
            scope: resp.scope,
            event_id: resp.event_id,
            password_mode: resp.password_mode,
            encrypted_private_key: resp.private_key,
            key_salt: resp.key_salt,
        }
    }
}

// Tokens are redacted so credentials can be logged without leaking them.
impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("event_id", &self.event_id)
            .field("password_mode", &self.password_mode)
            .field("key_salt", &self.key_salt)
            .finish_non_exhaustive()
    }
}
