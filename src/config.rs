//! Ambient configuration for the provider core
//!
//! Mirrors the teacher crate's `config::visualization::VisualizationConfig`
//! pattern: a plain `serde` struct with per-field defaults and an overall
//! `Default` impl, so an embedder can deserialize it from whatever format
//! they like (YAML, env, ...) without this crate prescribing one. Per §6 of
//! the specification the core itself defines no on-disk format or CLI; this
//! struct is the configuration *surface*, not a loader.

use serde::{Deserialize, Serialize};

/// Token time-to-live and provider-identity configuration.
///
/// ### Example
///
/// ```
/// use oidc_provider_core::config::ProviderConfig;
///
/// let config = ProviderConfig::default();
/// assert_eq!(config.code_ttl_seconds, 300);
/// assert_eq!(config.access_token_ttl_seconds, 600);
/// assert_eq!(config.refresh_token_ttl_seconds, 86400);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Server secret used to key the token MAC. Rotating this value
    /// invalidates every outstanding token (§4.1 `factory`).
    #[serde(default = "default_server_secret")]
    pub server_secret: String,

    /// Issuer name embedded in minted id_token / used as the `aud` value
    /// clients must present in JWS client assertions (§4.3, §6).
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Authorization-code TTL in seconds. Default 300s (§4.1).
    #[serde(default = "default_code_ttl")]
    pub code_ttl_seconds: i64,

    /// Access-token TTL in seconds. Default 600s (§4.1).
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl_seconds: i64,

    /// Refresh-token TTL in seconds. Default 86400s (§4.1).
    #[serde(default = "default_refresh_token_ttl")]
    pub refresh_token_ttl_seconds: i64,

    /// Whether `refresh_token` mints a fresh refresh token alongside the new
    /// access token, instead of keeping the same one alive until its own
    /// TTL. See the Open Question in §9 — the original source never rotates
    /// it, and this crate follows that behavior by default.
    #[serde(default)]
    pub rotate_refresh_token: bool,

    /// Maximum number of `(client_id, jti)` replay-cache entries retained
    /// for client-assertion JWTs (§4.3, §9).
    #[serde(default = "default_jti_cache_capacity")]
    pub jti_replay_cache_capacity: u64,

    /// Maximum age, in seconds, a client assertion's `exp` may be set to
    /// beyond `iat` (§4.3: "`exp` = iat + ≤600 s").
    #[serde(default = "default_max_assertion_lifetime")]
    pub max_assertion_lifetime_seconds: i64,
}

fn default_server_secret() -> String {
    "change-me".to_string()
}

fn default_issuer() -> String {
    "https://localhost".to_string()
}

fn default_code_ttl() -> i64 {
    300
}

fn default_access_token_ttl() -> i64 {
    600
}

fn default_refresh_token_ttl() -> i64 {
    86_400
}

fn default_jti_cache_capacity() -> u64 {
    10_000
}

fn default_max_assertion_lifetime() -> i64 {
    600
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            server_secret: default_server_secret(),
            issuer: default_issuer(),
            code_ttl_seconds: default_code_ttl(),
            access_token_ttl_seconds: default_access_token_ttl(),
            refresh_token_ttl_seconds: default_refresh_token_ttl(),
            rotate_refresh_token: false,
            jti_replay_cache_capacity: default_jti_cache_capacity(),
            max_assertion_lifetime_seconds: default_max_assertion_lifetime(),
        }
    }
}
