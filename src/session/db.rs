//! Session Database (§4.2)
//!
//! The authoritative state machine: `∅ → authz → token → revoked`, with
//! `refresh_token` as a `token → token` self-loop that mints a new access
//! token without touching the refresh token, and a replayed authorization
//! code poisoning the session — the next `refresh_token` call on its
//! derived refresh token fails `ExpiredToken` even though the token's own
//! TTL has not elapsed (§4.2 "double-exchange").
//!
//! Grounded in `original_source/tests/test_08_session.py`, which exercises
//! this exact sequence (`create_authz_session` → `do_sub` →
//! `upgrade_to_token` → `refresh_token` → replay → `revoke_token`) against
//! the Python implementation this crate's behavior is modeled on.
//!
//! Concurrency follows §5: every mutating operation takes its session's
//! `dashmap` shard lock for its full duration, so a `sid`'s `SessionInfo`,
//! its reverse-index entries and its `SsoDb` entries move together. Two
//! different sessions never contend.

use dashmap::DashMap;

use crate::error::{CoreError, CoreResult};
use crate::token::{TokenHandler, TokenKind};

use super::subject::{derive_subject, SubjectType};
use super::ssodb::SsoDb;
use super::{AuthnEvent, AuthorizationRequest, OauthState, ResponseType, SessionInfo};

/// The session database: the only component that mutates [`SessionInfo`].
pub struct SessionDatabase {
    token_handler: TokenHandler,
    sessions: DashMap<String, SessionInfo>,
    /// token string → sid, covering codes, access tokens and refresh tokens
    /// alike (§4.2, §5).
    reverse_index: DashMap<String, String>,
    ssodb: SsoDb,
}

impl SessionDatabase {
    pub fn new(token_handler: TokenHandler) -> Self {
        Self {
            token_handler,
            sessions: DashMap::new(),
            reverse_index: DashMap::new(),
            ssodb: SsoDb::new(),
        }
    }

    /// Begin a new session from a completed authentication event and the
    /// client's authorization request (§4.2 `create_authz_session`).
    ///
    /// Does not compute `sub`; call [`Self::do_sub`] separately.
    pub fn create_authz_session(
        &self,
        authn_event: AuthnEvent,
        authz_req: AuthorizationRequest,
        client_id: String,
        id_token: Option<String>,
        oidreq: Option<String>,
    ) -> String {
        let sid = uuid::Uuid::new_v4().to_string();
        let (code, _) = self.token_handler.mint(TokenKind::Code);
        self.reverse_index.insert(code.clone(), sid.clone());

        let info = SessionInfo {
            sid: sid.clone(),
            client_id,
            authn_req: authz_req,
            authn_event,
            sub: None,
            oauth_state: OauthState::Authz,
            code,
            access_token: None,
            refresh_token: None,
            id_token,
            token_type: None,
            expires_in: None,
            oidreq,
            revoked: false,
            code_used: false,
        };
        self.sessions.insert(sid.clone(), info);
        sid
    }

    /// Derive and bind `sub` for a session (§4.2, §4.4 `do_sub`).
    ///
    /// Idempotent in the sense required by I5: calling again with the same
    /// inputs recomputes the same value. Calling with different inputs
    /// rotates `sub`, and the old value is dropped from the SSO index.
    pub fn do_sub(
        &self,
        sid: &str,
        client_salt: &str,
        sector_id: Option<&str>,
        subject_type: SubjectType,
    ) -> CoreResult<String> {
        let mut entry = self
            .sessions
            .get_mut(sid)
            .ok_or_else(|| CoreError::NotFound(sid.to_string()))?;
        let sub = derive_subject(
            &entry.authn_event.uid,
            &entry.authn_event.salt,
            client_salt,
            subject_type,
            sector_id,
        );
        entry.sub = Some(sub.clone());
        self.ssodb.map_sid(sid, &sub, &entry.authn_event.uid);
        Ok(sub)
    }

    /// Exchange an authorization code for an access token, and optionally a
    /// refresh token (§4.2 `upgrade_to_token`).
    ///
    /// A second call with an already-used code fails with
    /// [`CoreError::AccessCodeUsed`] and revokes whatever tokens the first
    /// call issued, poisoning the session's refresh token for future
    /// `refresh_token` calls (§3 I4).
    pub fn upgrade_to_token(
        &self,
        code: &str,
        issue_refresh: bool,
        id_token: Option<String>,
        oidreq: Option<String>,
    ) -> CoreResult<SessionInfo> {
        self.token_handler.expect_kind(code, TokenKind::Code)?;
        let sid = self
            .reverse_index
            .get(code)
            .map(|entry| entry.clone())
            .ok_or_else(|| CoreError::NotFound(code.to_string()))?;
        let mut entry = self
            .sessions
            .get_mut(&sid)
            .ok_or_else(|| CoreError::NotFound(sid.clone()))?;

        if entry.code_used {
            if let Some(old_access) = entry.access_token.take() {
                self.reverse_index.remove(&old_access);
            }
            // Deliberately leave the refresh token's reverse-index entry in
            // place: clearing `entry.refresh_token` here (without removing
            // the index entry) is what makes a later `refresh_token` call
            // find the session but fail the `entry.refresh_token ==
            // Some(rtoken)` check below with `ExpiredToken`, matching §3 I4
            // / §8 scenario 4, rather than `NotFound`.
            entry.refresh_token = None;
            entry.revoked = true;
            entry.oauth_state = OauthState::Revoked;
            return Err(CoreError::AccessCodeUsed);
        }

        entry.code_used = true;

        let (access_token, expires_in) = self.token_handler.mint(TokenKind::Access);
        self.reverse_index.insert(access_token.clone(), sid.clone());
        entry.access_token = Some(access_token);

        if issue_refresh || entry.authn_req.wants_offline_access() {
            let (refresh_token, _) = self.token_handler.mint(TokenKind::Refresh);
            self.reverse_index.insert(refresh_token.clone(), sid.clone());
            entry.refresh_token = Some(refresh_token);
        }

        entry.oauth_state = OauthState::Token;
        entry.token_type = Some("Bearer".to_string());
        entry.expires_in = Some(expires_in);
        if let Some(id_token) = id_token {
            entry.id_token = Some(id_token);
        }
        if let Some(oidreq) = oidreq {
            entry.oidreq = Some(oidreq);
        }

        Ok(entry.clone())
    }

    /// Mint a fresh access token for a still-live refresh token (§4.2
    /// `refresh_token`).
    ///
    /// The refresh token itself is never rotated by default — see the
    /// `rotate_refresh_token` Open Question decision in `DESIGN.md`. If the
    /// authorization code this session descended from was replayed, the
    /// session's refresh token no longer matches what the caller presents,
    /// and this fails [`CoreError::ExpiredToken`] rather than "not found",
    /// matching §4.2's "equivalent to revoked" language.
    pub fn refresh_token(&self, rtoken: &str, client_id: &str) -> CoreResult<SessionInfo> {
        self.token_handler.expect_kind(rtoken, TokenKind::Refresh)?;
        let sid = self
            .reverse_index
            .get(rtoken)
            .map(|entry| entry.clone())
            .ok_or_else(|| CoreError::NotFound(rtoken.to_string()))?;
        let mut entry = self
            .sessions
            .get_mut(&sid)
            .ok_or_else(|| CoreError::NotFound(sid.clone()))?;

        if entry.client_id != client_id {
            return Err(CoreError::NotFound(rtoken.to_string()));
        }
        if entry.refresh_token.as_deref() != Some(rtoken) {
            return Err(CoreError::ExpiredToken);
        }

        let (access_token, expires_in) = self.token_handler.mint(TokenKind::Access);
        if let Some(old_access) = entry.access_token.take() {
            self.reverse_index.remove(&old_access);
        }
        self.reverse_index.insert(access_token.clone(), sid.clone());
        entry.access_token = Some(access_token);
        entry.expires_in = Some(expires_in);
        entry.oauth_state = OauthState::Refreshed;

        Ok(entry.clone())
    }

    /// Revoke a single token (§4.2 `revoke_token`).
    ///
    /// Revoking the authorization code cascades: it revokes the session's
    /// current access and refresh tokens transitively and marks the whole
    /// session revoked.
    pub fn revoke_token(&self, token: &str) -> CoreResult<()> {
        let sid = self
            .reverse_index
            .get(token)
            .map(|entry| entry.clone())
            .ok_or_else(|| CoreError::NotFound(token.to_string()))?;
        let mut entry = self
            .sessions
            .get_mut(&sid)
            .ok_or_else(|| CoreError::NotFound(sid.clone()))?;

        let code_revoked = entry.code == token;
        if code_revoked {
            if let Some(access) = entry.access_token.take() {
                self.reverse_index.remove(&access);
            }
            if let Some(refresh) = entry.refresh_token.take() {
                self.reverse_index.remove(&refresh);
            }
            entry.revoked = true;
            entry.oauth_state = OauthState::Revoked;
        } else if entry.access_token.as_deref() == Some(token) {
            entry.access_token = None;
        } else if entry.refresh_token.as_deref() == Some(token) {
            entry.refresh_token = None;
        }

        drop(entry);
        self.reverse_index.remove(token);
        if code_revoked {
            // Revoking the code terminates the session (§4.2); drop it from
            // the SSO index too, so `get_sids_by_sub` stops surfacing a sid
            // that can never transition again (§4.5).
            self.ssodb.remove_sid(&sid);
        }
        Ok(())
    }

    /// `true` iff `token` is live: unexpired, unrevoked, and still the
    /// session's current token of its kind (§4.2 `is_valid`).
    pub fn is_valid(&self, token: &str) -> bool {
        let meta = match self.token_handler.parse(token) {
            Ok(meta) => meta,
            Err(_) => return false,
        };
        if self.token_handler.is_expired(token).unwrap_or(true) {
            return false;
        }
        let sid = match self.reverse_index.get(token) {
            Some(sid) => sid.clone(),
            None => return false,
        };
        let entry = match self.sessions.get(&sid) {
            Some(entry) => entry,
            None => return false,
        };
        if entry.revoked {
            return false;
        }
        match meta.kind {
            TokenKind::Code => entry.code == token && !entry.code_used,
            TokenKind::Access => entry.access_token.as_deref() == Some(token),
            TokenKind::Refresh => entry.refresh_token.as_deref() == Some(token),
        }
    }

    /// Session ids carrying a given subject (§4.2 `get_sids_by_sub`, §4.5).
    pub fn get_sids_by_sub(&self, sub: &str) -> Vec<String> {
        self.ssodb.get_sids_by_sub(sub)
    }

    /// Raw read access (§4.2 `__getitem__`).
    pub fn get(&self, sid: &str) -> Option<SessionInfo> {
        self.sessions.get(sid).map(|entry| entry.clone())
    }

    /// Raw write access (§4.2 `__setitem__`). Callers that stash fields
    /// directly are responsible for keeping `SsoDb` consistent if they
    /// touch `sub`; prefer [`Self::do_sub`] when possible.
    pub fn set(&self, sid: &str, info: SessionInfo) {
        self.sessions.insert(sid.to_string(), info);
    }
}
