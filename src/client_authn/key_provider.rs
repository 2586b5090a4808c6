//! Key/Crypto Provider contract (§6)
//!
//! The second external collaborator the Client Authenticator consumes:
//! everything needed to verify a `client_assertion` JWS, whether HMAC'd
//! with a shared secret (`client_secret_jwt`) or signed with a client's
//! registered asymmetric key (`private_key_jwt`). Kept separate from
//! [`super::registry::ClientRegistry`] because an embedder's key material
//! (JWKS fetching, HSM-backed signing) rarely lives in the same place as
//! its client metadata.

use crate::error::CoreResult;

/// A verification key as handed back by [`KeyProvider::keys_for`]: either a
/// shared secret (`client_secret_jwt`) or an asymmetric public key
/// (`private_key_jwt`), already wrapped in the form `jsonwebtoken` expects.
#[derive(Clone)]
pub enum VerificationKey {
    Hmac(Vec<u8>),
    Rsa(jsonwebtoken::DecodingKey),
    Ec(jsonwebtoken::DecodingKey),
}

/// External collaborator for signing and verifying JWS material (§6).
///
/// `sign` is part of the contract for completeness (an endpoint minting an
/// `id_token` would use it) but is not exercised by the session/token/
/// client-authn core itself, which only ever verifies incoming assertions.
pub trait KeyProvider: Send + Sync {
    /// Sign a JSON payload with the algorithm and key id requested,
    /// returning a compact JWS.
    fn sign(&self, payload: &serde_json::Value, alg: jsonwebtoken::Algorithm, kid: Option<&str>) -> CoreResult<String>;

    /// Verify a compact JWS against a fixed key, restricted to one of
    /// `allowed_algs`, returning its decoded claim set.
    fn verify(
        &self,
        jws: &str,
        allowed_algs: &[jsonwebtoken::Algorithm],
        key: &VerificationKey,
    ) -> CoreResult<serde_json::Value>;

    /// The verification keys registered for `client_id`, for the given JWK
    /// `use` (`"sig"` in practice). Empty if the client has none registered.
    fn keys_for(&self, client_id: &str, use_: &str) -> CoreResult<Vec<VerificationKey>>;

    /// Raw HMAC-SHA256, used by `client_secret_jwt` verification when the
    /// caller needs the MAC directly rather than through `jsonwebtoken`.
    fn hmac_sha256(&self, key: &[u8], msg: &[u8]) -> Vec<u8>;
}
