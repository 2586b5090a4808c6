//! Token Handler (§4.1)
//!
//! Mints, parses and validates opaque tokens of three kinds — authorization
//! code (`A`), access token (`T`) and refresh token (`R`) — each with its own
//! TTL. A token is a URL-safe string that embeds `(kind, expiry, random
//! payload)` under an HMAC-SHA256 MAC keyed by a server secret, so `get_kind`
//! and `is_expired` recover kind/expiry without any lookup, while actual
//! validity (has the session database revoked it?) is the session database's
//! job, not this module's.
//!
//! Grounded in the teacher crate's `JwtIssuer`/`JwtTokenMap`
//! (`visualization/auth/jwt/issuer.rs`): a small `Arc`-wrapped struct exposing
//! `mint`/`parse`-style operations, cheap to clone and share across request
//! handlers. Unlike the teacher, tokens here are opaque HMAC-protected blobs
//! rather than JWTs — the session database, not the token itself, is the
//! source of truth for whether a token is still live (§4.1 encoding
//! contract).

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use rand::RngCore;
use ring::hmac;

use crate::config::ProviderConfig;
use crate::error::{CoreError, CoreResult};

const KIND_LEN: usize = 1;
const EXPIRY_LEN: usize = 8;
const RANDOM_LEN: usize = 16;
const PAYLOAD_LEN: usize = KIND_LEN + EXPIRY_LEN + RANDOM_LEN;
const MAC_LEN: usize = 32; // HMAC-SHA256 digest

/// The three token kinds the handler mints (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Authorization code, one-time use.
    Code,
    /// Bearer access token.
    Access,
    /// Long-lived refresh token.
    Refresh,
}

impl TokenKind {
    fn tag(self) -> u8 {
        match self {
            TokenKind::Code => b'A',
            TokenKind::Access => b'T',
            TokenKind::Refresh => b'R',
        }
    }

    fn from_tag(tag: u8) -> CoreResult<Self> {
        match tag {
            b'A' => Ok(TokenKind::Code),
            b'T' => Ok(TokenKind::Access),
            b'R' => Ok(TokenKind::Refresh),
            _ => Err(CoreError::Malformed),
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TokenKind::Code => "code",
            TokenKind::Access => "access_token",
            TokenKind::Refresh => "refresh_token",
        };
        f.write_str(s)
    }
}

/// The kind and expiry recovered from parsing a token, without any
/// server-side lookup.
#[derive(Debug, Clone, Copy)]
pub struct TokenMeta {
    pub kind: TokenKind,
    /// Unix timestamp (seconds) at which the token expires.
    pub expires_at: i64,
}

struct Inner {
    key: hmac::Key,
    code_ttl: i64,
    access_ttl: i64,
    refresh_ttl: i64,
}

/// Mints/parses/validates opaque tokens under a single server secret.
///
/// Cheap to clone: internally `Arc`-wrapped, same sharing pattern as the
/// teacher's `JwtIssuer`. Rotating the secret (constructing a new
/// `TokenHandler`) invalidates every outstanding token, which §4.1 calls out
/// as acceptable.
#[derive(Clone)]
pub struct TokenHandler(Arc<Inner>);

impl TokenHandler {
    /// Single-secret constructor (§4.1 `factory`).
    pub fn factory(secret: &[u8]) -> Self {
        Self::with_ttls(secret, 300, 600, 86_400)
    }

    /// Construct a handler using the TTLs from a [`ProviderConfig`].
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::with_ttls(
            config.server_secret.as_bytes(),
            config.code_ttl_seconds,
            config.access_token_ttl_seconds,
            config.refresh_token_ttl_seconds,
        )
    }

    fn with_ttls(secret: &[u8], code_ttl: i64, access_ttl: i64, refresh_ttl: i64) -> Self {
        let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
        TokenHandler(Arc::new(Inner {
            key,
            code_ttl,
            access_ttl,
            refresh_ttl,
        }))
    }

    /// The configured TTL, in seconds, for a given token kind.
    pub fn ttl_seconds(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Code => self.0.code_ttl,
            TokenKind::Access => self.0.access_ttl,
            TokenKind::Refresh => self.0.refresh_ttl,
        }
    }

    /// Mint a cryptographically random token of the given kind.
    ///
    /// Returns the opaque token string and the number of seconds until it
    /// expires.
    pub fn mint(&self, kind: TokenKind) -> (String, i64) {
        let ttl = self.ttl_seconds(kind);
        let expires_at = Utc::now().timestamp() + ttl;

        let mut payload = Vec::with_capacity(PAYLOAD_LEN);
        payload.push(kind.tag());
        payload.extend_from_slice(&expires_at.to_be_bytes());
        let mut random = [0u8; RANDOM_LEN];
        rand::rng().fill_bytes(&mut random);
        payload.extend_from_slice(&random);

        let tag = hmac::sign(&self.0.key, &payload);
        let mut token_bytes = payload;
        token_bytes.extend_from_slice(tag.as_ref());

        (URL_SAFE_NO_PAD.encode(token_bytes), ttl)
    }

    /// Decode a token and recover its kind and expiry, verifying the MAC.
    ///
    /// This does *not* consult the session database: a well-formed,
    /// correctly-MACed but revoked token still parses successfully. Callers
    /// that need full validity must additionally check
    /// [`crate::session::SessionDatabase::is_valid`].
    pub fn parse(&self, token: &str) -> CoreResult<TokenMeta> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| CoreError::Malformed)?;
        if bytes.len() != PAYLOAD_LEN + MAC_LEN {
            return Err(CoreError::Malformed);
        }
        let (payload, mac) = bytes.split_at(PAYLOAD_LEN);
        hmac::verify(&self.0.key, payload, mac).map_err(|_| CoreError::Malformed)?;

        let kind = TokenKind::from_tag(payload[0])?;
        let expires_at = i64::from_be_bytes(payload[1..9].try_into().unwrap());
        Ok(TokenMeta { kind, expires_at })
    }

    /// Recover just the kind of a token (§4.1 `get_kind`).
    pub fn get_kind(&self, token: &str) -> CoreResult<TokenKind> {
        self.parse(token).map(|meta| meta.kind)
    }

    /// Whether a token's embedded expiry has elapsed. Pure function of the
    /// embedded expiry; does not consult the session database.
    pub fn is_expired(&self, token: &str) -> CoreResult<bool> {
        let meta = self.parse(token)?;
        Ok(Utc::now().timestamp() >= meta.expires_at)
    }

    /// Parse a token and assert it is of the expected kind and unexpired.
    /// Convenience used by the session database, which otherwise would
    /// repeat this three-step check at every grant/refresh boundary.
    pub fn expect_kind(&self, token: &str, expected: TokenKind) -> CoreResult<TokenMeta> {
        let meta = self.parse(token)?;
        if meta.kind != expected {
            return Err(CoreError::WrongTokenType);
        }
        if Utc::now().timestamp() >= meta.expires_at {
            return Err(CoreError::ExpiredToken);
        }
        Ok(meta)
    }
}
