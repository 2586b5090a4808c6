//! SSODb — derived single-sign-on indices (§4.5)
//!
//! Three many-to-many mappings kept in lockstep with `SessionInfo` by
//! [`super::SessionDatabase`]: `sub → {sid}`, `uid → {sub}`, `sid → {sub,
//! uid}`. This struct is a cache, not a source of truth — it is rebuildable
//! from the sid→SessionInfo map and exists purely to make
//! `get_sids_by_sub`/`get_sids_by_uid` cheap.
//!
//! Backed by `dashmap`, the same concurrent-map crate the reverse token
//! index in [`super::db`] uses, so every mapping can be updated without a
//! single database-wide lock.

use std::collections::HashSet;

use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct SsoDb {
    sub_to_sids: DashMap<String, HashSet<String>>,
    uid_to_subs: DashMap<String, HashSet<String>>,
    sid_to_sub_uid: DashMap<String, (String, String)>,
}

impl SsoDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `sid` now maps to `(sub, uid)`, updating all three
    /// indices. If `sid` previously mapped to a different `sub`, the old
    /// `sub → sid` entry is removed so `do_sub`'s "rotate, last write wins"
    /// semantics (§4.2) hold here too.
    pub fn map_sid(&self, sid: &str, sub: &str, uid: &str) {
        if let Some((old_sub, _)) = self.sid_to_sub_uid.get(sid).map(|entry| entry.clone()) {
            if old_sub != sub {
                if let Some(mut sids) = self.sub_to_sids.get_mut(&old_sub) {
                    sids.remove(sid);
                }
            }
        }

        self.sub_to_sids.entry(sub.to_string()).or_default().insert(sid.to_string());
        self.uid_to_subs.entry(uid.to_string()).or_default().insert(sub.to_string());
        self.sid_to_sub_uid.insert(sid.to_string(), (sub.to_string(), uid.to_string()));
    }

    /// Drop every index entry that references `sid` (§4.2 `revoke_token`
    /// cascades, §4.5 `remove_sid`).
    pub fn remove_sid(&self, sid: &str) {
        if let Some((_, (sub, _))) = self.sid_to_sub_uid.remove(sid) {
            if let Some(mut sids) = self.sub_to_sids.get_mut(&sub) {
                sids.remove(sid);
            }
        }
    }

    pub fn get_sids_by_sub(&self, sub: &str) -> Vec<String> {
        self.sub_to_sids
            .get(sub)
            .map(|sids| sids.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_subs_by_uid(&self, uid: &str) -> Vec<String> {
        self.uid_to_subs
            .get(uid)
            .map(|subs| subs.iter().cloned().collect())
            .unwrap_or_default()
    }
}
