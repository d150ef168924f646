//! Assembly of the two-step authentication exchange and session state.
//!
//! A [`Handshake`] walks one authentication attempt through its states:
//!
//! ```text
//! Idle -> AwaitingAuthParams -> ProofComputed -> Authenticated -> Unlocked
//! ```
//!
//! with `Failed(reason)` reachable from any non-terminal state. [`AuthClient`]
//! drives handshakes against the transport collaborator and owns the
//! process-wide [`Session`] that a successful unlock commits into.

use std::sync::{Mutex, PoisonError};

use super::error::{AuthError, Result, TransportError};
use super::models::{
    AuthInfoRequest, AuthInfoResponse, AuthParameters, AuthRequest, AuthResponse,
    SessionCredentials,
};
use super::modulus::ModulusVerifier;
use super::srp::{self, SrpProofs};
use super::unlock::{self, KeyRing};
use crate::crypto;

/// Transport collaborator performing the two network round-trips.
///
/// Implementations own HTTP, JSON and retry policy; this layer never retries
/// and surfaces transport failures verbatim.
pub trait AuthTransport {
    /// Fetch the auth parameters for a username (`POST /auth/info`).
    fn fetch_auth_info(
        &self,
        req: &AuthInfoRequest,
    ) -> std::result::Result<AuthInfoResponse, TransportError>;

    /// Submit the client proof (`POST /auth`).
    fn submit_proof(&self, req: &AuthRequest)
    -> std::result::Result<AuthResponse, TransportError>;
}

/// Registered API client credentials sent with every auth request.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Registered client identifier.
    pub client_id: String,
    /// Registered client secret.
    pub client_secret: String,
}

/// Why a handshake ended in [`HandshakeState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// The transport collaborator failed.
    Transport,
    /// The server-supplied modulus was rejected.
    InvalidModulus,
    /// The server ephemeral was rejected.
    InvalidServerEphemeral,
    /// The server could not prove knowledge of the verifier.
    ServerProofMismatch,
    /// The key ring could not be parsed.
    MalformedKeyRing,
    /// The key ring rejected the passphrase.
    DecryptionFailed,
    /// A crypto helper failed.
    Crypto,
}

impl From<&AuthError> for AuthFailure {
    fn from(err: &AuthError) -> Self {
        match err {
            AuthError::Transport(_) => AuthFailure::Transport,
            AuthError::InvalidModulus(_) => AuthFailure::InvalidModulus,
            AuthError::InvalidServerEphemeral => AuthFailure::InvalidServerEphemeral,
            AuthError::ServerProofMismatch => AuthFailure::ServerProofMismatch,
            AuthError::MalformedKeyRing(_) => AuthFailure::MalformedKeyRing,
            AuthError::DecryptionFailed(_) => AuthFailure::DecryptionFailed,
            AuthError::Crypto(_) => AuthFailure::Crypto,
        }
    }
}

/// Position of a handshake in the authentication exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Nothing fetched yet.
    Idle,
    /// Auth parameters requested or present; proof not yet computed.
    AwaitingAuthParams,
    /// Client ephemeral and proof computed, not yet submitted.
    ProofComputed,
    /// Server proof verified; credentials available.
    Authenticated,
    /// Private key ring decrypted.
    Unlocked,
    /// Terminal failure; the attempt must be restarted from a fresh
    /// parameter fetch.
    Failed(AuthFailure),
}

/// One authentication attempt.
///
/// Owns the attempt's parameters, proofs and credentials; nothing is shared
/// between attempts, so different users may authenticate concurrently with
/// a handshake each. Abandoning a handshake mid-way drops all derived
/// secrets; a retry must start over with fresh parameters.
pub struct Handshake {
    username: String,
    state: HandshakeState,
    params: Option<AuthParameters>,
    proofs: Option<SrpProofs>,
    credentials: Option<SessionCredentials>,
}

impl Handshake {
    /// Start an attempt that will fetch its own auth parameters.
    pub fn new(username: &str) -> Self {
        Handshake {
            username: username.to_string(),
            state: HandshakeState::Idle,
            params: None,
            proofs: None,
            credentials: None,
        }
    }

    /// Start an attempt from pre-fetched auth parameters, skipping the first
    /// round-trip.
    ///
    /// Used to resume a known two-factor challenge without re-deriving
    /// parameters. Parameters must not be reused after a proof submission;
    /// a failed proof needs a fresh fetch.
    pub fn with_parameters(username: &str, params: AuthParameters) -> Self {
        Handshake {
            username: username.to_string(),
            state: HandshakeState::AwaitingAuthParams,
            params: Some(params),
            proofs: None,
            credentials: None,
        }
    }

    /// Current state of the attempt.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// The attempt's auth parameters, once fetched.
    pub fn parameters(&self) -> Option<&AuthParameters> {
        self.params.as_ref()
    }

    /// The session credentials, once authenticated.
    pub fn credentials(&self) -> Option<&SessionCredentials> {
        self.credentials.as_ref()
    }

    /// Fetch auth parameters from the transport.
    ///
    /// # Panics
    /// Panics if called from any state but [`HandshakeState::Idle`].
    pub fn fetch_parameters(
        &mut self,
        config: &ClientConfig,
        transport: &impl AuthTransport,
    ) -> Result<()> {
        assert_eq!(
            self.state,
            HandshakeState::Idle,
            "fetch_parameters() may only be called from Idle"
        );
        self.state = HandshakeState::AwaitingAuthParams;

        let req = AuthInfoRequest {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            username: self.username.clone(),
        };
        match transport.fetch_auth_info(&req) {
            Ok(resp) => {
                self.params = Some(AuthParameters::from_response(resp));
                Ok(())
            }
            Err(e) => self.fail(e.into()),
        }
    }

    /// Compute the client ephemeral and proofs from the password.
    ///
    /// # Panics
    /// Panics if auth parameters are not present yet.
    pub fn compute_proofs(
        &mut self,
        password: &[u8],
        verifier: &impl ModulusVerifier,
    ) -> Result<()> {
        assert_eq!(
            self.state,
            HandshakeState::AwaitingAuthParams,
            "compute_proofs() requires fetched auth parameters"
        );
        let params = self
            .params
            .as_ref()
            .expect("AwaitingAuthParams implies parameters are present");

        match srp::compute_proofs(password, params, verifier) {
            Ok(proofs) => {
                self.proofs = Some(proofs);
                self.state = HandshakeState::ProofComputed;
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    /// Submit the proof, verify the server's counter-proof and collect the
    /// session credentials.
    ///
    /// On a server proof mismatch the response is discarded whole; no
    /// credential from an unverified server is ever exposed.
    ///
    /// # Panics
    /// Panics if called before [`Handshake::compute_proofs`] succeeded.
    pub fn submit(
        &mut self,
        config: &ClientConfig,
        transport: &impl AuthTransport,
        two_factor_code: Option<&str>,
    ) -> Result<SessionCredentials> {
        assert_eq!(
            self.state,
            HandshakeState::ProofComputed,
            "submit() requires computed proofs"
        );
        let params = self
            .params
            .as_ref()
            .expect("ProofComputed implies parameters are present");
        let proofs = self
            .proofs
            .as_ref()
            .expect("ProofComputed implies proofs are present");

        let req = AuthRequest {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            username: self.username.clone(),
            srp_session: params.session_id.clone(),
            client_ephemeral: proofs.client_ephemeral_b64(),
            client_proof: proofs.client_proof_b64(),
            two_factor_code: two_factor_code.unwrap_or_default().to_string(),
        };
        let resp = match transport.submit_proof(&req) {
            Ok(resp) => resp,
            Err(e) => return self.fail(e.into()),
        };

        let server_proof = match crypto::decode_b64(&resp.server_proof) {
            Ok(bytes) => bytes,
            Err(e) => return self.fail(e.into()),
        };
        if let Err(e) = proofs.verify_server_proof(&server_proof) {
            log::warn!("server failed to prove knowledge of the password verifier");
            drop(resp);
            return self.fail(e);
        }

        let credentials = SessionCredentials::from_response(resp);
        self.credentials = Some(credentials.clone());
        self.state = HandshakeState::Authenticated;
        log::debug!("authenticated user {}", credentials.user_id);
        Ok(credentials)
    }

    /// Decrypt the private key ring with the account password.
    ///
    /// A failed unlock leaves the handshake [`HandshakeState::Authenticated`]
    /// so the caller can re-prompt and retry without a new network exchange.
    ///
    /// # Panics
    /// Panics if called before [`Handshake::submit`] succeeded.
    pub fn unlock<K: KeyRing>(&mut self, password: &[u8]) -> Result<K> {
        assert_eq!(
            self.state,
            HandshakeState::Authenticated,
            "unlock() requires verified credentials"
        );
        let credentials = self
            .credentials
            .as_ref()
            .expect("Authenticated implies credentials are present");

        let ring = unlock::unlock(credentials, password)?;
        self.state = HandshakeState::Unlocked;
        Ok(ring)
    }

    fn fail<T>(&mut self, err: AuthError) -> Result<T> {
        self.state = HandshakeState::Failed(AuthFailure::from(&err));
        self.params = None;
        self.proofs = None;
        self.credentials = None;
        Err(err)
    }
}

/// Identity committed after a successful unlock.
pub struct SessionIdentity<K> {
    /// Session user identifier.
    pub user_id: String,
    /// Bearer token for subsequent API calls.
    pub access_token: String,
    /// The decrypted private key ring.
    pub key_ring: K,
}

/// Process-wide session state of one client.
///
/// The identity slot is replaced exactly once per successful unlock and
/// guarded by a mutex, so concurrent unlock attempts on the same client
/// serialize instead of racing.
pub struct Session<K> {
    identity: Mutex<Option<SessionIdentity<K>>>,
}

impl<K> Session<K> {
    fn new() -> Self {
        Session {
            identity: Mutex::new(None),
        }
    }

    /// Whether an unlocked identity is present.
    pub fn is_unlocked(&self) -> bool {
        self.lock().is_some()
    }

    /// User id of the committed identity, if any.
    pub fn user_id(&self) -> Option<String> {
        self.lock().as_ref().map(|id| id.user_id.clone())
    }

    /// Access token of the committed identity, if any.
    pub fn access_token(&self) -> Option<String> {
        self.lock().as_ref().map(|id| id.access_token.clone())
    }

    /// Drop the committed identity, ending the session.
    pub fn clear(&self) {
        *self.lock() = None;
    }

    pub(crate) fn commit(&self, identity: SessionIdentity<K>) {
        *self.lock() = Some(identity);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<SessionIdentity<K>>> {
        // A poisoned slot only ever holds a fully committed identity, so
        // recovering it is safe.
        self.identity.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Client-side authenticator binding transport, modulus verification and
/// key-ring capability together.
pub struct AuthClient<T, V, K> {
    config: ClientConfig,
    transport: T,
    modulus_verifier: V,
    session: Session<K>,
}

impl<T, V, K> AuthClient<T, V, K>
where
    T: AuthTransport,
    V: ModulusVerifier,
    K: KeyRing,
{
    /// Create a client with an empty session.
    pub fn new(config: ClientConfig, transport: T, modulus_verifier: V) -> Self {
        AuthClient {
            config,
            transport,
            modulus_verifier,
            session: Session::new(),
        }
    }

    /// The client's session state.
    pub fn session(&self) -> &Session<K> {
        &self.session
    }

    /// Fetch auth parameters for a username without starting a handshake.
    ///
    /// The returned parameters may be passed to [`AuthClient::auth`] to skip
    /// its parameter fetch, e.g. when resuming a two-factor challenge.
    pub fn auth_info(&self, username: &str) -> Result<AuthParameters> {
        let req = AuthInfoRequest {
            client_id: self.config.client_id.clone(),
            client_secret: self.config.client_secret.clone(),
            username: username.to_string(),
        };
        let resp = self.transport.fetch_auth_info(&req)?;
        Ok(AuthParameters::from_response(resp))
    }

    /// Run the SRP handshake and return verified session credentials.
    ///
    /// When `params` is `None` the parameters are fetched first. The
    /// two-factor code, if any, is forwarded untouched with the proof
    /// submission.
    pub fn auth(
        &self,
        username: &str,
        password: &[u8],
        two_factor_code: Option<&str>,
        params: Option<AuthParameters>,
    ) -> Result<SessionCredentials> {
        let mut handshake = match params {
            Some(p) => Handshake::with_parameters(username, p),
            None => {
                let mut h = Handshake::new(username);
                h.fetch_parameters(&self.config, &self.transport)?;
                h
            }
        };
        handshake.compute_proofs(password, &self.modulus_verifier)?;
        handshake.submit(&self.config, &self.transport, two_factor_code)
    }

    /// Decrypt the key ring for authenticated credentials and commit the
    /// resulting identity into the session.
    ///
    /// May be retried with a different password on [`AuthError::DecryptionFailed`]
    /// without repeating the network handshake.
    pub fn unlock(&self, credentials: &SessionCredentials, password: &[u8]) -> Result<K>
    where
        K: Clone,
    {
        let ring: K = unlock::unlock(credentials, password)?;
        self.session.commit(SessionIdentity {
            user_id: credentials.user_id.clone(),
            access_token: credentials.access_token.clone(),
            key_ring: ring.clone(),
        });
        Ok(ring)
    }

    /// Authenticate and unlock in one call, for single-password accounts.
    ///
    /// Two-password accounts should call [`AuthClient::auth`] and then
    /// [`AuthClient::unlock`] with the mailbox password instead.
    pub fn login(
        &self,
        username: &str,
        password: &[u8],
        two_factor_code: Option<&str>,
    ) -> Result<(SessionCredentials, K)>
    where
        K: Clone,
    {
        let mut handshake = Handshake::new(username);
        handshake.fetch_parameters(&self.config, &self.transport)?;
        handshake.compute_proofs(password, &self.modulus_verifier)?;
        let credentials = handshake.submit(&self.config, &self.transport, two_factor_code)?;
        let ring: K = handshake.unlock(password)?;
        self.session.commit(SessionIdentity {
            user_id: credentials.user_id.clone(),
            access_token: credentials.access_token.clone(),
            key_ring: ring.clone(),
        });
        Ok((credentials, ring))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::modulus::ArmorOnly;

    struct FailingTransport;

    impl AuthTransport for FailingTransport {
        fn fetch_auth_info(
            &self,
            _req: &AuthInfoRequest,
        ) -> std::result::Result<AuthInfoResponse, TransportError> {
            Err(TransportError::new("connection refused"))
        }

        fn submit_proof(
            &self,
            _req: &AuthRequest,
        ) -> std::result::Result<AuthResponse, TransportError> {
            Err(TransportError::new("connection refused"))
        }
    }

    fn config() -> ClientConfig {
        ClientConfig {
            client_id: "test-client".into(),
            client_secret: "test-secret".into(),
        }
    }

    fn bogus_params() -> AuthParameters {
        AuthParameters {
            version: 4,
            modulus: "not armored at all".into(),
            server_ephemeral: "QUJD".into(),
            salt: "c2FsdA==".into(),
            session_id: "sess1".into(),
            two_factor_enabled: false,
        }
    }

    #[test]
    fn test_new_handshake_is_idle() {
        let handshake = Handshake::new("user");
        assert_eq!(handshake.state(), HandshakeState::Idle);
        assert!(handshake.parameters().is_none());
    }

    #[test]
    fn test_with_parameters_skips_fetch() {
        let handshake = Handshake::with_parameters("user", bogus_params());
        assert_eq!(handshake.state(), HandshakeState::AwaitingAuthParams);
        assert_eq!(handshake.parameters().unwrap().session_id, "sess1");
    }

    #[test]
    fn test_fetch_failure_is_terminal() {
        let mut handshake = Handshake::new("user");
        let result = handshake.fetch_parameters(&config(), &FailingTransport);
        assert!(matches!(result, Err(AuthError::Transport(_))));
        assert_eq!(
            handshake.state(),
            HandshakeState::Failed(AuthFailure::Transport)
        );
    }

    #[test]
    fn test_bad_modulus_is_terminal() {
        let mut handshake = Handshake::with_parameters("user", bogus_params());
        let result = handshake.compute_proofs(b"password", &ArmorOnly);
        assert!(matches!(result, Err(AuthError::InvalidModulus(_))));
        assert_eq!(
            handshake.state(),
            HandshakeState::Failed(AuthFailure::InvalidModulus)
        );
    }

    #[test]
    #[should_panic(expected = "submit() requires computed proofs")]
    fn test_submit_before_compute_panics() {
        let mut handshake = Handshake::with_parameters("user", bogus_params());
        let _ = handshake.submit(&config(), &FailingTransport, None);
    }

    #[test]
    fn test_session_lifecycle() {
        let session: Session<Vec<u8>> = Session::new();
        assert!(!session.is_unlocked());
        assert_eq!(session.user_id(), None);

        session.commit(SessionIdentity {
            user_id: "uid1".into(),
            access_token: "token".into(),
            key_ring: vec![1, 2, 3],
        });
        assert!(session.is_unlocked());
        assert_eq!(session.user_id().as_deref(), Some("uid1"));
        assert_eq!(session.access_token().as_deref(), Some("token"));

        session.clear();
        assert!(!session.is_unlocked());
        assert_eq!(session.access_token(), None);
    }
}
