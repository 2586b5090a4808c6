//! Session Database (§3, §4.2)
//!
//! The authoritative state for the OIDC authorization-code → access-token →
//! refresh-token lifecycle. [`SessionDatabase`] is the only component that
//! mutates [`SessionInfo`]; everything else here ([`AuthnEvent`],
//! [`AuthorizationRequest`], [`SsoDb`], [`subject::derive_subject`]) is data
//! or a pure function it depends on.
//!
//! Grounded in the teacher's `OxideState` (`visualization/auth/oauth2/state.rs`)
//! for the "small `Arc`-wrapped struct, shared across request handlers"
//! shape, and in `original_source/tests/test_08_session.py` for the exact
//! state-machine behavior (double-exchange, refresh poisoning, revocation
//! cascades) the distilled spec only summarizes.

mod db;
mod ssodb;
pub mod subject;

pub use db::SessionDatabase;
pub use ssodb::SsoDb;
pub use subject::SubjectType;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fact: "user `uid` was authenticated at `authn_time` by `authn_info`,
/// valid until `valid_until`" (§3). Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthnEvent {
    pub uid: String,
    pub salt: String,
    pub authn_time: DateTime<Utc>,
    /// Descriptor of the authentication method used (e.g. "password",
    /// "webauthn"). Opaque to this crate.
    pub authn_info: String,
    pub valid_until: DateTime<Utc>,
}

impl AuthnEvent {
    /// Construct an event valid for `valid_for_seconds` starting now.
    pub fn new(uid: impl Into<String>, salt: impl Into<String>, authn_info: impl Into<String>, valid_for_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            uid: uid.into(),
            salt: salt.into(),
            authn_time: now,
            authn_info: authn_info.into(),
            valid_until: now + chrono::Duration::seconds(valid_for_seconds),
        }
    }

    /// `true` iff `now < valid_until` (§3).
    pub fn valid(&self) -> bool {
        Utc::now() < self.valid_until
    }
}

/// The `response_type` values an [`AuthorizationRequest`] may carry, in the
/// order the client requested them (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Code,
    Token,
    IdToken,
    None,
}

/// The client's original authorization request (§3). Endpoint glue
/// constructs this from the wire request; this crate never parses a query
/// string itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: HashSet<String>,
    pub response_type: Vec<ResponseType>,
    pub state: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub claims: Option<serde_json::Value>,
    #[serde(default)]
    pub request: Option<String>,
}

impl AuthorizationRequest {
    /// `true` iff the request's scope contains `offline_access`, the scope
    /// that makes a refresh token eligible (§4.2 I3).
    pub fn wants_offline_access(&self) -> bool {
        self.scope.contains("offline_access")
    }
}

/// The OAuth/OIDC state of a session (§3). Transitions are enforced by
/// [`SessionDatabase`], never set directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OauthState {
    Authz,
    Token,
    Refreshed,
    Revoked,
}

/// The central record binding a session id to everything the OIDC flow has
/// accumulated for it so far (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub sid: String,
    pub client_id: String,
    pub authn_req: AuthorizationRequest,
    pub authn_event: AuthnEvent,
    pub sub: Option<String>,
    pub oauth_state: OauthState,
    pub code: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
    pub oidreq: Option<String>,
    pub revoked: bool,
    /// Latches `true` on the first exchange of `code` (§3, I4).
    pub code_used: bool,
}
