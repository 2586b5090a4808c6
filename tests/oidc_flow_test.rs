//! End-to-end exercise of the authorization-code -> access-token ->
//! refresh-token lifecycle and client-authentication dispatch, driving only
//! the crate's public API the way an embedding endpoint would.
//!
//! Mirrors the teacher's top-level `tests/rs256_pkce_flow_test.rs` /
//! `tests/oauth_scope_validation_test.rs` convention of a dedicated
//! integration test per OAuth flow, rather than relying solely on the
//! colocated unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use base64::{engine::general_purpose::STANDARD, Engine as _};

use oidc_provider_core::client_authn::{
    AuthnMethod, AuthnRequest, ClientAuthenticator, ClientInfo, ClientRegistry, KeyProvider,
    ReplayCache, VerificationKey,
};
use oidc_provider_core::error::{CoreError, CoreResult};
use oidc_provider_core::session::{AuthnEvent, AuthorizationRequest, OauthState, ResponseType, SessionDatabase};
use oidc_provider_core::session::subject::SubjectType;
use oidc_provider_core::token::TokenHandler;

fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

fn authz_req(client_id: &str, offline_access: bool) -> AuthorizationRequest {
    let mut scope = HashSet::from(["openid".to_string()]);
    if offline_access {
        scope.insert("offline_access".to_string());
    }
    AuthorizationRequest {
        client_id: client_id.to_string(),
        redirect_uri: "https://client.example.com/cb".to_string(),
        scope,
        response_type: vec![ResponseType::Code],
        state: Some("xyz".to_string()),
        nonce: None,
        prompt: None,
        claims: None,
        request: None,
    }
}

#[test]
fn full_authorization_code_lifecycle() {
    init_logging();
    let db = SessionDatabase::new(TokenHandler::factory(b"integration-test-secret"));

    let event = AuthnEvent::new("alice", "salt", "password", 300);
    let sid = db.create_authz_session(event, authz_req("client_1", true), "client_1".to_string(), None, None);

    let created = db.get(&sid).expect("session exists right after creation");
    assert_eq!(created.oauth_state, OauthState::Authz);
    assert!(created.sub.is_none(), "do_sub has not run yet");

    let sub = db
        .do_sub(&sid, "client-salt", None, SubjectType::Public)
        .expect("subject derivation succeeds for a known sid");
    assert_eq!(db.get_sids_by_sub(&sub), vec![sid.clone()]);

    let code = created.code;
    let upgraded = db
        .upgrade_to_token(&code, false, None, None)
        .expect("a fresh, unused code upgrades cleanly");
    assert_eq!(upgraded.oauth_state, OauthState::Token);
    assert_eq!(upgraded.token_type.as_deref(), Some("Bearer"));
    let access_token = upgraded.access_token.clone().expect("offline_access scope requested");
    let refresh_token = upgraded.refresh_token.clone().expect("offline_access scope requested a refresh token");
    assert!(db.is_valid(&access_token));
    assert!(db.is_valid(&refresh_token));
    assert!(!db.is_valid(&code), "the code is single-use");

    let refreshed = db
        .refresh_token(&refresh_token, "client_1")
        .expect("the refresh token is still live");
    assert_eq!(refreshed.oauth_state, OauthState::Refreshed);
    assert_ne!(refreshed.access_token.as_deref(), Some(access_token.as_str()));
    assert!(!db.is_valid(&access_token), "the old access token was superseded");
    assert!(db.is_valid(&refresh_token), "refresh tokens are not rotated by default");

    // Replaying the original code poisons everything it derived.
    let err = db.upgrade_to_token(&code, false, None, None).unwrap_err();
    assert!(matches!(err, CoreError::AccessCodeUsed));
    let err = db.refresh_token(&refresh_token, "client_1").unwrap_err();
    assert!(matches!(err, CoreError::ExpiredToken));
}

#[test]
fn revoking_a_session_cascades_through_its_tokens() {
    init_logging();
    let db = SessionDatabase::new(TokenHandler::factory(b"integration-test-secret"));
    let event = AuthnEvent::new("bob", "salt", "password", 300);
    let sid = db.create_authz_session(event, authz_req("client_1", true), "client_1".to_string(), None, None);
    let code = db.get(&sid).unwrap().code;

    let session = db.upgrade_to_token(&code, true, None, None).unwrap();
    let access = session.access_token.unwrap();
    let refresh = session.refresh_token.unwrap();

    db.revoke_token(&code).expect("the code is a live, known token");

    assert!(!db.is_valid(&access));
    assert!(!db.is_valid(&refresh));
    assert!(!db.is_valid(&code));
}

/// A minimal in-memory `ClientRegistry`, standing in for whatever store an
/// embedder runs; exercises [`ClientAuthenticator::verify_client`] without
/// pulling in the crate's private `mockall` test doubles, which are not
/// visible outside `client_authn`.
struct InMemoryRegistry {
    clients: Mutex<HashMap<String, ClientInfo>>,
}

impl InMemoryRegistry {
    fn with_client(client: ClientInfo) -> Self {
        let mut clients = HashMap::new();
        clients.insert(client.client_id.clone(), client);
        Self { clients: Mutex::new(clients) }
    }
}

impl ClientRegistry for InMemoryRegistry {
    fn get(&self, client_id: &str) -> CoreResult<ClientInfo> {
        self.clients
            .lock()
            .unwrap()
            .get(client_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(client_id.to_string()))
    }

    fn record_auth_method(&self, client_id: &str, request_class: &str, method: &str) -> CoreResult<()> {
        let mut clients = self.clients.lock().unwrap();
        let client = clients
            .get_mut(client_id)
            .ok_or_else(|| CoreError::NotFound(client_id.to_string()))?;
        client.auth_method.insert(request_class.to_string(), method.to_string());
        Ok(())
    }
}

/// No client assertions are exercised in this integration test (that's
/// covered by `client_authn::jwt_assertion`'s unit tests), so this provider
/// never needs to do real cryptography.
struct NullKeyProvider;

impl KeyProvider for NullKeyProvider {
    fn sign(&self, _payload: &serde_json::Value, _alg: jsonwebtoken::Algorithm, _kid: Option<&str>) -> CoreResult<String> {
        unimplemented!("not exercised by client_secret_basic/post")
    }

    fn verify(&self, _jws: &str, _allowed_algs: &[jsonwebtoken::Algorithm], _key: &VerificationKey) -> CoreResult<serde_json::Value> {
        unimplemented!("not exercised by client_secret_basic/post")
    }

    fn keys_for(&self, _client_id: &str, _use_: &str) -> CoreResult<Vec<VerificationKey>> {
        Ok(vec![])
    }

    fn hmac_sha256(&self, _key: &[u8], _msg: &[u8]) -> Vec<u8> {
        unimplemented!("not exercised by client_secret_basic/post")
    }
}

fn client_info(client_id: &str, secret: &str) -> ClientInfo {
    ClientInfo {
        client_id: client_id.to_string(),
        client_secret: secret.to_string(),
        client_secret_expires_at: 0,
        redirect_uris: vec!["https://client.example.com/cb".to_string()],
        jwks: None,
        jwks_uri: None,
        token_endpoint_auth_method: "client_secret_basic".to_string(),
        response_types: vec!["code".to_string()],
        auth_method: HashMap::new(),
    }
}

#[test]
fn client_secret_basic_dispatch_authenticates_and_records_method() {
    init_logging();
    let registry = Arc::new(InMemoryRegistry::with_client(client_info("client_1", "s3cr3t")));
    let auth = ClientAuthenticator::new(
        registry.clone(),
        Arc::new(NullKeyProvider),
        ReplayCache::new(1_000, 600),
        vec!["https://issuer.example.com".to_string()],
        600,
    );

    let credentials = STANDARD.encode("client_1:s3cr3t");
    let request = AuthnRequest {
        authorization_header: Some(format!("Basic {credentials}")),
        ..Default::default()
    };

    let result = auth.verify_client(&request, "TokenRequest").expect("correct secret authenticates");
    assert_eq!(result.client_id, "client_1");
    assert_eq!(result.method, AuthnMethod::ClientSecretBasic);

    let recorded = registry.get("client_1").unwrap();
    assert_eq!(recorded.auth_method.get("TokenRequest").map(String::as_str), Some("client_secret_basic"));
}

#[test]
fn client_secret_basic_dispatch_rejects_wrong_secret() {
    init_logging();
    let registry = Arc::new(InMemoryRegistry::with_client(client_info("client_1", "s3cr3t")));
    let auth = ClientAuthenticator::new(
        registry,
        Arc::new(NullKeyProvider),
        ReplayCache::new(1_000, 600),
        vec!["https://issuer.example.com".to_string()],
        600,
    );

    let credentials = STANDARD.encode("client_1:wrong-secret");
    let request = AuthnRequest {
        authorization_header: Some(format!("Basic {credentials}")),
        ..Default::default()
    };

    let err = auth.verify_client(&request, "TokenRequest").unwrap_err();
    assert!(matches!(err, CoreError::AuthnFailure));
}
