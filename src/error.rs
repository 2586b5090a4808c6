//! Shared error taxonomy
//!
//! Every fallible operation exposed by [`crate::token`], [`crate::session`]
//! and [`crate::client_authn`] returns [`CoreError`]. Endpoint glue (out of
//! scope for this crate) maps each variant to an HTTP status as described in
//! the component design: `AuthnFailure`/`ExpiredToken`-style grant errors to
//! `invalid_grant`, `UnknownAuthnMethod` to 400, and so on.

use thiserror::Error;

/// The error taxonomy surfaced by the session database, token handler and
/// client authenticator.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A client credential (secret, JWS signature, ...) did not verify.
    #[error("client authentication failed")]
    AuthnFailure,

    /// No recognized authentication credential was found in the request.
    #[error("no recognized client authentication method in the request")]
    UnknownAuthnMethod,

    /// A JWS `aud` claim did not match this server's issuer or token endpoint.
    #[error("assertion audience does not match this server")]
    NotForMe,

    /// JWS verification could not find a usable key for the signer.
    #[error("no matching key available to verify the assertion: {0}")]
    NoMatchingKey(String),

    /// The authorization code has already been exchanged once.
    #[error("authorization code has already been used")]
    AccessCodeUsed,

    /// The caller presented a token of a different kind than expected.
    #[error("token is not of the expected kind")]
    WrongTokenType,

    /// The token's TTL has elapsed, or it was poisoned by a replayed code.
    #[error("token has expired")]
    ExpiredToken,

    /// The token string could not be decoded at all.
    #[error("token is malformed")]
    Malformed,

    /// A session id, client id or token was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Error surfaced while verifying or decoding a client assertion JWS.
    #[error("assertion verification error: {0}")]
    Jws(#[from] jsonwebtoken::errors::Error),
}

/// Convenience alias used throughout this crate.
pub type CoreResult<T> = Result<T, CoreError>;

/// Strip control characters and cap the length of user-supplied material
/// before it is echoed into a log line or error message.
///
/// Grounded in `oicsrv.sanitize` from the original Python implementation:
/// untrusted strings (client_id, redirect_uri, raw assertions) flow straight
/// from the wire into error paths, and must not be allowed to inject
/// newlines or blow up log volume.
pub fn sanitize(input: &str) -> String {
    const MAX_LEN: usize = 200;
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_LEN)
        .collect();
    cleaned
}
