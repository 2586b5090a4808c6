//! Client Registry contract (§6)
//!
//! [`ClientRegistry`] is an external collaborator: this crate only depends
//! on its contract, never on a concrete storage backend. Mirrors the
//! teacher's `ConfigLoader::find_client` (`utility/jwt_token.rs`) in spirit
//! — a lookup keyed by client id — but expressed as a trait so an embedder
//! can back it with whatever store they already run.

use std::collections::HashMap;

use crate::error::CoreResult;

/// A registered OIDC/OAuth2 client (§3 `ClientInfo`).
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub client_id: String,
    pub client_secret: String,
    /// Unix timestamp; `0` means the secret never expires.
    pub client_secret_expires_at: i64,
    pub redirect_uris: Vec<String>,
    /// Inline JWKS, when the client's keys are registered directly rather
    /// than fetched from a `jwks_uri`.
    pub jwks: Option<serde_json::Value>,
    pub jwks_uri: Option<String>,
    pub token_endpoint_auth_method: String,
    pub response_types: Vec<String>,
    /// Last-used authentication method per request class, e.g.
    /// `{"TokenRequest": "client_secret_basic"}` (§4.3).
    pub auth_method: HashMap<String, String>,
}

impl ClientInfo {
    /// `true` iff the client's secret has a nonzero expiry that has already
    /// passed (§4.3 "reject if `client_secret_expires_at != 0 ∧ < now`").
    pub fn secret_expired(&self, now: i64) -> bool {
        self.client_secret_expires_at != 0 && self.client_secret_expires_at < now
    }
}

/// External collaborator holding registered clients (§6).
///
/// An embedder implements this against whatever store backs their client
/// database; this crate never assumes a storage technology.
pub trait ClientRegistry: Send + Sync {
    /// Look up a client, or `Err(`[`crate::error::CoreError::NotFound`]`)`.
    fn get(&self, client_id: &str) -> CoreResult<ClientInfo>;

    /// Record that `client_id` last authenticated using `method` for
    /// `request_class` (§4.3). Per the Open Question in `DESIGN.md`, this
    /// must initialize the map on first use rather than silently no-op.
    fn record_auth_method(&self, client_id: &str, request_class: &str, method: &str) -> CoreResult<()>;
}
