//! # OIDC Provider Core
//!
//! The session/token lifecycle core of an OpenID Connect provider: the part
//! that authenticates clients, mints and validates opaque tokens, and tracks
//! the state binding an authorization grant to the access and refresh tokens
//! derived from it.
//!
//! ## Main Components
//!
//! - **[`token`]**: mints, parses and validates opaque authorization-code,
//!   access-token and refresh-token strings.
//! - **[`session`]**: the authoritative session database — creation of
//!   authorization sessions, subject derivation, the authz → token →
//!   refreshed → revoked state machine, and the SSO index.
//! - **[`client_authn`]**: recognizes and verifies the six standard OIDC
//!   client-authentication methods against a client registry.
//! - **[`config`]**: ambient configuration (TTLs, server secret, issuer).
//! - **[`error`]**: the shared error taxonomy surfaced by every operation.
//!
//! ## Out of scope
//!
//! HTTP transport, cookie framing, template rendering, user-info storage,
//! discovery/well-known metadata, and the user-authentication UI are external
//! collaborators. This crate only defines the contracts they must honor
//! (see [`client_authn::ClientRegistry`] and [`client_authn::KeyProvider`]).

/// Client authentication: the six standard OIDC client-auth methods and
/// their dispatch.
pub mod client_authn;

/// Ambient configuration: token TTLs, server secret, issuer name.
pub mod config;

/// The error taxonomy shared by every fallible operation in this crate.
pub mod error;

/// The session database: authorization sessions, subject derivation, the
/// authz/token/refreshed/revoked state machine, and the SSO index.
pub mod session;

/// Minting, parsing and validating opaque tokens of distinct kinds.
pub mod token;

pub use config::ProviderConfig;
pub use error::CoreError;
