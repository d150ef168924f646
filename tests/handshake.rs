//! End-to-end authentication tests against a simulated SRP server.
//!
//! The fake transport performs the real server-side SRP computation from a
//! stored verifier, so these tests exercise the whole exchange: parameter
//! fetch, proof computation, mutual proof verification and key unlock.

use std::collections::HashMap;
use std::sync::Mutex;

use num_bigint::BigUint;

use mailauth_core::auth::{
    ArmorOnly, AuthClient, AuthError, AuthFailure, AuthInfoRequest, AuthInfoResponse,
    AuthParameters, AuthRequest, AuthResponse, AuthTransport, ClientConfig, Handshake,
    HandshakeState, KeyRing, KeyRingError, PasswordMode, TransportError,
};
use mailauth_core::crypto::{
    self,
    bigint::{self, MODULUS_BYTES},
    hash::{expand_hash, expand_hash_parts},
    kdf,
};

/// RFC 5054 2048-bit group prime, big-endian hex.
const PRIME_2048_HEX: &str = "\
    AC6BDB41324A9A9BF166DE5E1389582FAF72B6651987EE07FC3192943DB56050\
    A37329CBB4A099ED8193E0757767A13DD52312AB4B03310DCD7F48A9DA04FD50\
    E8083969EDB767B0CF6095179A163AB3661A05FBD5FAAAE82918A9962F0B93B8\
    55F97993EC975EEAA80D740ADBF4FF747359D041D5C33EA71D281E446B14773B\
    CA97B43A23FB801676BD207A436C6481F1D2B9078717461A5B9D32E688F87748\
    544523B524B0D57D5EA77A2775D2ECFA032CFBDBF52FB3786160279004E57AE6\
    AF874E7303CE53299CCC041C7BC308D82A5698F3A8D0C38271AE35F8E9DBFBB6\
    94B5C803D89F7AE435DE236D525F54759B65E372FCD68EF20FA7111F9E4AFF73";

const AUTH_SALT: [u8; 10] = [11u8; 10];
const KEY_SALT: [u8; 16] = [22u8; 16];

fn modulus_le_bytes() -> Vec<u8> {
    let mut bytes = crypto::decode_hex(PRIME_2048_HEX).unwrap();
    bytes.reverse();
    bytes
}

fn clearsign(payload: &str) -> String {
    format!(
        "-----BEGIN PGP SIGNED MESSAGE-----\n\
         Hash: SHA256\n\
         \n\
         {payload}\n\
         -----BEGIN PGP SIGNATURE-----\n\
         dGVzdCBzaWduYXR1cmU=\n\
         -----END PGP SIGNATURE-----\n"
    )
}

/// Key ring stand-in: each armored line holds the hex passphrase that entry
/// was "encrypted" with.
#[derive(Debug, Clone)]
struct FakeKeyRing {
    entries: Vec<Vec<u8>>,
    unlocked: bool,
}

impl KeyRing for FakeKeyRing {
    fn parse_armored(armored: &str) -> Result<Self, KeyRingError> {
        let entries = armored
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| crypto::decode_hex(line.trim()).map_err(|e| KeyRingError::new(e.to_string())))
            .collect::<Result<_, _>>()?;
        Ok(FakeKeyRing {
            entries,
            unlocked: false,
        })
    }

    fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn decrypt_entries(&mut self, passphrase: &[u8]) -> Result<(), KeyRingError> {
        for entry in &self.entries {
            if entry != passphrase {
                return Err(KeyRingError::new("wrong passphrase"));
            }
        }
        self.unlocked = true;
        Ok(())
    }
}

struct PendingSession {
    b_secret: BigUint,
    b_bytes: Vec<u8>,
}

/// Server-side SRP over a stored verifier, behind the transport trait.
struct FakeServer {
    account_password: Vec<u8>,
    password_mode: PasswordMode,
    mailbox_passphrase: Vec<u8>,
    required_two_factor: Option<String>,
    tamper_server_proof: bool,
    sessions: Mutex<HashMap<String, PendingSession>>,
    next_session: Mutex<u32>,
}

impl FakeServer {
    fn new(account_password: &[u8]) -> Self {
        let passphrase = kdf::compute_key_password(account_password, &KEY_SALT).unwrap();
        FakeServer {
            account_password: account_password.to_vec(),
            password_mode: PasswordMode::Single,
            mailbox_passphrase: passphrase.to_vec(),
            required_two_factor: None,
            tamper_server_proof: false,
            sessions: Mutex::new(HashMap::new()),
            next_session: Mutex::new(0),
        }
    }

    fn two_passwords(account_password: &[u8], mailbox_password: &[u8]) -> Self {
        let mut server = Self::new(account_password);
        server.password_mode = PasswordMode::Two;
        server.mailbox_passphrase = mailbox_password.to_vec();
        server
    }

    fn verifier(&self, n: &BigUint, n_bytes: &[u8]) -> BigUint {
        let hashed = kdf::hash_password(&self.account_password, &AUTH_SALT, n_bytes, 4).unwrap();
        let x = bigint::from_le(&hashed);
        BigUint::from(2u32).modpow(&x, n)
    }

    fn key_ring_armored(&self) -> String {
        let line = crypto::encode_hex(&self.mailbox_passphrase);
        format!("{line}\n{line}\n")
    }
}

impl AuthTransport for FakeServer {
    fn fetch_auth_info(&self, _req: &AuthInfoRequest) -> Result<AuthInfoResponse, TransportError> {
        let n_bytes = modulus_le_bytes();
        let n = bigint::from_le(&n_bytes);
        let g = BigUint::from(2u32);
        let g_bytes = bigint::to_le_padded(&g, MODULUS_BYTES);

        let verifier = self.verifier(&n, &n_bytes);
        let k = bigint::from_le(&expand_hash_parts(&[&g_bytes, &n_bytes])) % &n;

        let b_secret = bigint::from_le(
            &bigint::random_bytes(64).map_err(|e| TransportError::new(e.to_string()))?,
        );
        let b_pub = (&k * &verifier + g.modpow(&b_secret, &n)) % &n;
        let b_bytes = bigint::to_le_padded(&b_pub, MODULUS_BYTES);

        let session_id = {
            let mut counter = self.next_session.lock().unwrap();
            *counter += 1;
            format!("srp-session-{}", *counter)
        };
        self.sessions
            .lock()
            .unwrap()
            .insert(session_id.clone(), PendingSession { b_secret, b_bytes: b_bytes.clone() });

        Ok(AuthInfoResponse {
            version: 4,
            modulus: clearsign(&crypto::encode_b64(&n_bytes)),
            server_ephemeral: crypto::encode_b64(&b_bytes),
            salt: crypto::encode_b64(&AUTH_SALT),
            srp_session: session_id,
            two_factor: u8::from(self.required_two_factor.is_some()),
        })
    }

    fn submit_proof(&self, req: &AuthRequest) -> Result<AuthResponse, TransportError> {
        if let Some(required) = &self.required_two_factor {
            if req.two_factor_code != *required {
                return Err(TransportError::new("incorrect two-factor code"));
            }
        }

        let pending = self
            .sessions
            .lock()
            .unwrap()
            .remove(&req.srp_session)
            .ok_or_else(|| TransportError::new("unknown SRP session"))?;

        let n_bytes = modulus_le_bytes();
        let n = bigint::from_le(&n_bytes);
        let verifier = self.verifier(&n, &n_bytes);

        let a_bytes =
            crypto::decode_b64(&req.client_ephemeral).map_err(|e| TransportError::new(e.to_string()))?;
        let m1 =
            crypto::decode_b64(&req.client_proof).map_err(|e| TransportError::new(e.to_string()))?;

        let a = bigint::from_le(&a_bytes);
        let u = bigint::from_le(&expand_hash_parts(&[&a_bytes, &pending.b_bytes]));
        let shared = (&a * verifier.modpow(&u, &n)).modpow(&pending.b_secret, &n);
        let key = expand_hash(&bigint::to_le_padded(&shared, MODULUS_BYTES));

        let expected_m1 = expand_hash_parts(&[&a_bytes, &pending.b_bytes, &key]);
        if expected_m1 != m1 {
            return Err(TransportError::new("invalid credentials"));
        }

        let mut m2 = expand_hash_parts(&[&a_bytes, &m1, &key]);
        if self.tamper_server_proof {
            m2[0] ^= 0x01;
        }

        Ok(AuthResponse {
            access_token: "token-1".into(),
            token_type: "Bearer".into(),
            expires_in: 3600,
            scope: "full".into(),
            uid: "uid-1".into(),
            refresh_token: "refresh-1".into(),
            event_id: "event-1".into(),
            password_mode: self.password_mode,
            server_proof: crypto::encode_b64(&m2),
            private_key: self.key_ring_armored(),
            key_salt: crypto::encode_b64(&KEY_SALT),
        })
    }
}

fn config() -> ClientConfig {
    ClientConfig {
        client_id: "test-client".into(),
        client_secret: "test-secret".into(),
    }
}

fn client(server: FakeServer) -> AuthClient<FakeServer, ArmorOnly, FakeKeyRing> {
    AuthClient::new(config(), server, ArmorOnly)
}

#[test]
fn test_login_single_password_end_to_end() {
    let client = client(FakeServer::new(b"correct"));

    let (creds, ring) = client.login("user@example.com", b"correct", None).unwrap();
    assert_eq!(creds.user_id, "uid-1");
    assert_eq!(creds.password_mode, PasswordMode::Single);
    assert!(ring.unlocked);

    assert!(client.session().is_unlocked());
    assert_eq!(client.session().user_id().as_deref(), Some("uid-1"));
    assert_eq!(client.session().access_token().as_deref(), Some("token-1"));
}

#[test]
fn test_wrong_password_rejected_by_server() {
    let client = client(FakeServer::new(b"correct"));

    let result = client.auth("user@example.com", b"incorrect", None, None);
    assert!(matches!(result, Err(AuthError::Transport(_))));
    assert!(!client.session().is_unlocked());
}

#[test]
fn test_tampered_server_proof_fails_handshake() {
    let mut server = FakeServer::new(b"correct");
    server.tamper_server_proof = true;

    let mut handshake = Handshake::new("user@example.com");
    handshake.fetch_parameters(&config(), &server).unwrap();
    handshake.compute_proofs(b"correct", &ArmorOnly).unwrap();

    let result = handshake.submit(&config(), &server, None);
    assert!(matches!(result, Err(AuthError::ServerProofMismatch)));
    assert_eq!(
        handshake.state(),
        HandshakeState::Failed(AuthFailure::ServerProofMismatch)
    );
    // No credential from an unverified server leaks out.
    assert!(handshake.credentials().is_none());
}

#[test]
fn test_tampered_server_proof_via_client() {
    let mut server = FakeServer::new(b"correct");
    server.tamper_server_proof = true;
    let client = client(server);

    let result = client.auth("user@example.com", b"correct", None, None);
    assert!(matches!(result, Err(AuthError::ServerProofMismatch)));
    assert!(!client.session().is_unlocked());
}

#[test]
fn test_two_password_flow_with_unlock_retry() {
    let client = client(FakeServer::two_passwords(b"login-pass", b"mailbox-secret"));

    let creds = client.auth("user@example.com", b"login-pass", None, None).unwrap();
    assert_eq!(creds.password_mode, PasswordMode::Two);

    // Wrong mailbox password: unlock fails but the credentials stay usable.
    let result = client.unlock(&creds, b"not-the-mailbox-pass");
    assert!(matches!(result, Err(AuthError::DecryptionFailed(_))));
    assert!(!client.session().is_unlocked());

    let ring = client.unlock(&creds, b"mailbox-secret").unwrap();
    assert!(ring.unlocked);
    assert!(client.session().is_unlocked());
}

#[test]
fn test_prefetched_parameters_skip_first_round_trip() {
    let client = client(FakeServer::new(b"correct"));

    let params: AuthParameters = client.auth_info("user@example.com").unwrap();
    assert!(!params.two_factor_enabled);

    let creds = client
        .auth("user@example.com", b"correct", None, Some(params))
        .unwrap();
    assert_eq!(creds.user_id, "uid-1");
}

#[test]
fn test_two_factor_code_forwarded() {
    let mut server = FakeServer::new(b"correct");
    server.required_two_factor = Some("123456".into());
    let client = client(server);

    let params = client.auth_info("user@example.com").unwrap();
    assert!(params.two_factor_enabled);

    let result = client.auth("user@example.com", b"correct", None, None);
    assert!(matches!(result, Err(AuthError::Transport(_))));

    let creds = client
        .auth("user@example.com", b"correct", Some("123456"), None)
        .unwrap();
    assert_eq!(creds.user_id, "uid-1");
}
