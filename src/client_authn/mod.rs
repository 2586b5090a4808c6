//! Client Authenticator (§4.3)
//!
//! Six client-authentication methods, recognized and dispatched as a closed
//! sum type rather than a class hierarchy (§9 "tagged variants, not class
//! hierarchy"): [`AuthnMethod`] names the method, [`ClientAuthenticator::verify_client`]
//! matches on which credential the incoming request actually carries and
//! verifies it against the [`ClientRegistry`] and [`KeyProvider`]
//! collaborators.
//!
//! Grounded in `original_source/src/oicsrv/client_authn.py` for the method
//! set, dispatch order and exception taxonomy (`AuthnFailure`,
//! `NoMatchingKey`, `UnknownAuthnMethod`), and in the teacher's
//! `ConfigLoader`/`TokenCreator` (`utility/jwt_token.rs`) for the style of
//! "look the caller up, reject with a precise error" collaborator calls.

mod jwt_assertion;
mod key_provider;
mod registry;

pub use jwt_assertion::{AuthnToken, ReplayCache, JWT_BEARER_GRANT_URN};
pub use key_provider::{KeyProvider, VerificationKey};
pub use registry::{ClientInfo, ClientRegistry};

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use jsonwebtoken::{Algorithm, Validation};

use crate::error::{sanitize, CoreError, CoreResult};

/// The six standard client-authentication methods (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthnMethod {
    ClientSecretBasic,
    ClientSecretPost,
    ClientSecretJwt,
    PrivateKeyJwt,
    BearerHeader,
    BearerBody,
}

impl AuthnMethod {
    /// The wire name used in `token_endpoint_auth_method` and recorded
    /// into `ClientInfo::auth_method` (§4.3).
    pub fn name(self) -> &'static str {
        match self {
            AuthnMethod::ClientSecretBasic => "client_secret_basic",
            AuthnMethod::ClientSecretPost => "client_secret_post",
            AuthnMethod::ClientSecretJwt => "client_secret_jwt",
            AuthnMethod::PrivateKeyJwt => "private_key_jwt",
            AuthnMethod::BearerHeader => "bearer_header",
            AuthnMethod::BearerBody => "bearer_body",
        }
    }
}

/// Everything a caller can supply across the six methods, already pulled
/// out of the HTTP request by endpoint glue (out of scope for this crate —
/// see §9 "no global state", this is the explicit context value that
/// replaces it).
#[derive(Debug, Clone, Default)]
pub struct AuthnRequest {
    pub authorization_header: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub client_assertion: Option<String>,
    pub client_assertion_type: Option<String>,
    pub access_token: Option<String>,
}

/// Outcome of a successful [`ClientAuthenticator::verify_client`] call.
#[derive(Debug, Clone)]
pub struct AuthnResult {
    /// Empty for `bearer_header`/`bearer_body` per the source behavior
    /// this crate follows (see the Open Question decision in `DESIGN.md`).
    pub client_id: String,
    pub method: AuthnMethod,
}

/// Dispatches and verifies client authentication against a [`ClientRegistry`]
/// and [`KeyProvider`] (§4.3).
pub struct ClientAuthenticator {
    registry: Arc<dyn ClientRegistry>,
    keys: Arc<dyn KeyProvider>,
    replay_cache: ReplayCache,
    accepted_audiences: Vec<String>,
    max_assertion_lifetime_seconds: i64,
}

impl ClientAuthenticator {
    pub fn new(
        registry: Arc<dyn ClientRegistry>,
        keys: Arc<dyn KeyProvider>,
        replay_cache: ReplayCache,
        accepted_audiences: Vec<String>,
        max_assertion_lifetime_seconds: i64,
    ) -> Self {
        Self {
            registry,
            keys,
            replay_cache,
            accepted_audiences,
            max_assertion_lifetime_seconds,
        }
    }

    /// Inspect `request` and verify whichever client-authentication method
    /// it carries, in the order specified in §4.3: `Authorization` header,
    /// then body `client_id`+`client_secret`, then `client_assertion`, then
    /// body `access_token`, else [`CoreError::UnknownAuthnMethod`].
    pub fn verify_client(&self, request: &AuthnRequest, request_class: &str) -> CoreResult<AuthnResult> {
        let result = if let Some(header) = &request.authorization_header {
            self.verify_authorization_header(header)?
        } else if let (Some(client_id), Some(secret)) = (&request.client_id, &request.client_secret) {
            self.verify_shared_secret(client_id, secret, AuthnMethod::ClientSecretPost)?
        } else if let Some(assertion) = &request.client_assertion {
            self.verify_client_assertion(assertion)?
        } else if let Some(access_token) = &request.access_token {
            log::warn!("bearer_body authentication used; client_id left unresolved");
            let _ = access_token;
            AuthnResult {
                client_id: String::new(),
                method: AuthnMethod::BearerBody,
            }
        } else {
            return Err(CoreError::UnknownAuthnMethod);
        };

        if !result.client_id.is_empty() {
            self.finish(&result, request_class)?;
        }
        Ok(result)
    }

    fn verify_authorization_header(&self, header: &str) -> CoreResult<AuthnResult> {
        if let Some(encoded) = header.strip_prefix("Basic ") {
            let decoded = STANDARD.decode(encoded.trim()).map_err(|_| CoreError::AuthnFailure)?;
            let decoded = String::from_utf8(decoded).map_err(|_| CoreError::AuthnFailure)?;
            let (client_id, secret) = decoded.split_once(':').ok_or(CoreError::AuthnFailure)?;
            self.verify_shared_secret(client_id, secret, AuthnMethod::ClientSecretBasic)
        } else if let Some(token) = header.strip_prefix("Bearer ") {
            log::warn!("bearer_header authentication used; client_id left unresolved");
            let _ = token;
            Ok(AuthnResult {
                client_id: String::new(),
                method: AuthnMethod::BearerHeader,
            })
        } else {
            Err(CoreError::UnknownAuthnMethod)
        }
    }

    fn verify_shared_secret(&self, client_id: &str, secret: &str, method: AuthnMethod) -> CoreResult<AuthnResult> {
        let client = self
            .registry
            .get(client_id)
            .map_err(|_| CoreError::AuthnFailure)?;
        if ring::constant_time::verify_slices(secret.as_bytes(), client.client_secret.as_bytes()).is_err() {
            return Err(CoreError::AuthnFailure);
        }
        Ok(AuthnResult {
            client_id: client.client_id,
            method,
        })
    }

    fn verify_client_assertion(&self, assertion: &str) -> CoreResult<AuthnResult> {
        let header = jsonwebtoken::decode_header(assertion)?;

        // Peek at the claims without verifying the signature yet: we need
        // `iss`/`sub` (== client_id) to know which secret or key to verify
        // against (§9 "no global state" — client_id is not known a priori).
        let mut unverified = Validation::new(header.alg);
        unverified.insecure_disable_signature_validation();
        unverified.validate_exp = false;
        unverified.validate_aud = false;
        let unverified_claims: AuthnToken = jsonwebtoken::decode::<AuthnToken>(
            assertion,
            &jsonwebtoken::DecodingKey::from_secret(&[]),
            &unverified,
        )
        .map_err(|_| CoreError::AuthnFailure)?
        .claims;

        let client_id = sanitize(&unverified_claims.iss);
        let client = self
            .registry
            .get(&client_id)
            .map_err(|_| CoreError::AuthnFailure)?;

        let accepted: Vec<&str> = self.accepted_audiences.iter().map(|s| s.as_str()).collect();
        unverified_claims.validate_claims(&client_id, &accepted, self.max_assertion_lifetime_seconds)?;
        self.replay_cache.check_and_insert(&client_id, &unverified_claims.jti)?;

        let method = match header.alg {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                let key = VerificationKey::Hmac(client.client_secret.as_bytes().to_vec());
                self.keys
                    .verify(assertion, &[header.alg], &key)
                    .map_err(|_| CoreError::AuthnFailure)?;
                AuthnMethod::ClientSecretJwt
            }
            _ => {
                let keys = self.keys.keys_for(&client_id, "sig")?;
                if keys.is_empty() {
                    return Err(CoreError::NoMatchingKey(client_id.clone()));
                }
                let verified = keys
                    .iter()
                    .any(|key| self.keys.verify(assertion, &[header.alg], key).is_ok());
                if !verified {
                    return Err(CoreError::NoMatchingKey(client_id.clone()));
                }
                AuthnMethod::PrivateKeyJwt
            }
        };

        Ok(AuthnResult {
            client_id: client.client_id,
            method,
        })
    }

    fn finish(&self, result: &AuthnResult, request_class: &str) -> CoreResult<()> {
        let client = self.registry.get(&result.client_id)?;
        let now = Utc::now().timestamp();
        if client.secret_expired(now) {
            return Err(CoreError::AuthnFailure);
        }
        self.registry
            .record_auth_method(&result.client_id, request_class, result.method.name())
    }
}
