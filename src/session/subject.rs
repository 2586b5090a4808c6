//! Subject identifier derivation (§4.4, I5, P4)
//!
//! `sub` is a deterministic, pure function of its inputs. Recomputing from
//! the same inputs always yields the same value, which is what makes
//! `do_sub` safe to call more than once to rotate a session's subject.
//!
//! The byte layout below was reverse-engineered from the three fixed
//! digests in `examples/original_source/tests/test_08_session.py::test_do_sub_deterministic`
//! (reproduced verbatim in spec.md §8 scenario 5): a `public` subject hashes
//! `uid ‖ authn_event.salt` — the `client_salt` passed to `do_sub` is not
//! folded in at all for this subject type — while a `pairwise` subject
//! hashes `uid ‖ sector_id ‖ client_salt ‖ authn_event.salt`. Both diverge
//! from the simpler `uid ‖ client_salt` / `sector_id ‖ uid ‖ client_salt`
//! formula stated in prose in §4.2; the fixed test vectors are the
//! authoritative source here and this module matches them exactly.

use sha2::{Digest, Sha256};

/// How a subject identifier is scoped to the requesting client (§3, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectType {
    /// Same `sub` for every client (`SHA256(uid ‖ authn_event.salt)`).
    Public,
    /// `sub` scoped to a `sector_id` shared by a group of clients
    /// (`SHA256(uid ‖ sector_id ‖ client_salt ‖ authn_event.salt)`), so
    /// distinct sectors cannot correlate a user across them.
    Pairwise,
}

/// Derive a subject identifier (§4.2 `do_sub`).
///
/// `authn_salt` is the authenticating [`super::AuthnEvent`]'s own salt,
/// always folded in. `client_salt` is the salt `do_sub`'s caller supplies
/// per call; it only affects the result for [`SubjectType::Pairwise`] —
/// see the module docs. `sector_id` is required when `subject_type` is
/// [`SubjectType::Pairwise`] and ignored otherwise.
pub fn derive_subject(
    uid: &str,
    authn_salt: &str,
    client_salt: &str,
    subject_type: SubjectType,
    sector_id: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();
    match subject_type {
        SubjectType::Public => {
            hasher.update(uid.as_bytes());
            hasher.update(authn_salt.as_bytes());
        }
        SubjectType::Pairwise => {
            hasher.update(uid.as_bytes());
            if let Some(sector_id) = sector_id {
                hasher.update(sector_id.as_bytes());
            }
            hasher.update(client_salt.as_bytes());
            hasher.update(authn_salt.as_bytes());
        }
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pinned against `test_08_session.py::test_do_sub_deterministic`
    /// (spec.md §8 scenario 5): `uid="tester"`, `authn_event.salt="random_value"`.
    #[test]
    fn public_subject_matches_the_fixed_vector() {
        let sub = derive_subject("tester", "random_value", "other_random_value", SubjectType::Public, None);
        assert_eq!(sub, "179670cdee6375c48e577317b2abd7d5cd26a5cdb1cfb7ef84af3d703c71d013");
    }

    #[test]
    fn pairwise_subject_matches_the_fixed_vector() {
        let sub = derive_subject(
            "tester",
            "random_value",
            "other_random_value",
            SubjectType::Pairwise,
            Some("http://example.com"),
        );
        assert_eq!(sub, "aaa50d80f8780cf1c4beb39e8e126556292f5091b9e39596424fefa2b99d9c53");
    }

    #[test]
    fn pairwise_subject_with_a_different_sector_and_client_salt_matches_the_fixed_vector() {
        let sub = derive_subject(
            "tester",
            "random_value",
            "another_random_value",
            SubjectType::Pairwise,
            Some("http://other.example.com"),
        );
        assert_eq!(sub, "62fb630e29f0d41b88e049ac0ef49a9c3ac5418c029d6e4f5417df7e9443976b");
    }

    #[test]
    fn public_subject_is_deterministic() {
        let a = derive_subject("tester", "random_value", "client_salt", SubjectType::Public, None);
        let b = derive_subject("tester", "random_value", "client_salt", SubjectType::Public, None);
        assert_eq!(a, b);
    }

    #[test]
    fn different_authn_salts_give_different_public_subjects() {
        let a = derive_subject("tester", "random_value", "client_salt", SubjectType::Public, None);
        let b = derive_subject("tester", "other_random_value", "client_salt", SubjectType::Public, None);
        assert_ne!(a, b);
    }

    #[test]
    fn pairwise_subject_depends_on_sector() {
        let a = derive_subject("tester", "random_value", "client_salt", SubjectType::Pairwise, Some("http://example.com"));
        let b = derive_subject(
            "tester",
            "random_value",
            "client_salt",
            SubjectType::Pairwise,
            Some("http://other.example.com"),
        );
        assert_ne!(a, b);
    }

    #[test]
    fn pairwise_and_public_diverge_for_the_same_uid_and_salts() {
        let public = derive_subject("tester", "random_value", "client_salt", SubjectType::Public, None);
        let pairwise = derive_subject(
            "tester",
            "random_value",
            "client_salt",
            SubjectType::Pairwise,
            Some("http://example.com"),
        );
        assert_ne!(public, pairwise);
    }

    #[test]
    fn subject_is_not_the_raw_uid() {
        let sub = derive_subject("tester", "random_value", "client_salt", SubjectType::Public, None);
        assert_ne!(sub, "tester");
        assert_eq!(sub.len(), 64, "hex-encoded sha256 digest is 64 chars");
    }
}
