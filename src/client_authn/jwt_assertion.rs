//! `client_assertion` JWT handling (§4.3, §6, §9)
//!
//! Both JWS-based client-authentication methods (`client_secret_jwt`,
//! `private_key_jwt`) present the same claim shape — [`AuthnToken`] — over
//! different key material. This module owns that shared shape plus the
//! `jti` replay cache the specification flags as missing from the source
//! implementation (§9 "Replay defense for JWT `jti`").
//!
//! Grounded in `original_source/src/oicsrv/client_authn.py`, which imports
//! `JWT_BEARER` for the grant-type URN this module re-exports as
//! [`JWT_BEARER_GRANT_URN`], and in the teacher's `TokenCreationError`
//! (`utility/jwt_token.rs`) for the `thiserror`-plus-`#[from]` shape errors
//! here are expected to compose with.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::sync::Cache;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Grant-type URN used by RFC 7523 JWT-bearer client assertions; must match
/// the wire constant exactly (§6).
pub const JWT_BEARER_GRANT_URN: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// The claim set carried by a `client_assertion` JWS (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthnToken {
    pub iss: String,
    pub sub: String,
    pub aud: Vec<String>,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl AuthnToken {
    /// Structural checks independent of signature verification: `iss ==
    /// sub == client_id`, `aud` contains one of the server's accepted
    /// audiences, `exp` is in the future, and the assertion's lifetime
    /// (`exp - iat`) does not exceed `max_lifetime_seconds` (§4.3).
    pub fn validate_claims(&self, client_id: &str, accepted_audiences: &[&str], max_lifetime_seconds: i64) -> CoreResult<()> {
        if self.iss != client_id || self.sub != client_id {
            return Err(CoreError::AuthnFailure);
        }
        if !self.aud.iter().any(|aud| accepted_audiences.contains(&aud.as_str())) {
            return Err(CoreError::NotForMe);
        }
        let now = Utc::now().timestamp();
        if self.exp <= now {
            return Err(CoreError::ExpiredToken);
        }
        if self.exp - self.iat > max_lifetime_seconds {
            return Err(CoreError::AuthnFailure);
        }
        if self.jti.len() < 16 {
            // base64/hex encodings of a 128-bit random value are at least
            // this long; reject anything clearly too short to carry 128
            // bits of entropy (§4.3 "jti (random, >=128 bits)").
            return Err(CoreError::AuthnFailure);
        }
        Ok(())
    }
}

/// Bounded replay cache keyed by `(client_id, jti)`, entries expiring after
/// the maximum assertion lifetime (§4.3, §9).
///
/// The specification calls this out as missing from the source
/// implementation; a `moka` TTL cache is this crate's answer.
#[derive(Clone)]
pub struct ReplayCache(Arc<Cache<(String, String), ()>>);

impl ReplayCache {
    pub fn new(capacity: u64, ttl_seconds: i64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(Duration::from_secs(ttl_seconds.max(0) as u64))
            .build();
        Self(Arc::new(cache))
    }

    /// Record `(client_id, jti)` as seen, returning an error if it was
    /// already present — i.e. the assertion is a replay.
    pub fn check_and_insert(&self, client_id: &str, jti: &str) -> CoreResult<()> {
        let key = (client_id.to_string(), jti.to_string());
        if self.0.contains_key(&key) {
            return Err(CoreError::AuthnFailure);
        }
        self.0.insert(key, ());
        Ok(())
    }
}
