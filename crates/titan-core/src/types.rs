use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::constants::GUEST_USER;

// ── IdentityId ───────────────────────────────────────────────────────────────

/// Opaque identity identifier issued by the CA at registration time.
///
/// The token-issuing surface never learns anything beyond this id; the CA is
/// the only component that can relate it to a public key.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
    /// Mint a fresh opaque id (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityId({})", &self.0[..self.0.len().min(8)])
    }
}

// ── ChallengeId ──────────────────────────────────────────────────────────────

/// Identifier of a single issued challenge. One id per nonce; multiple
/// challenges may be in flight for the same identity.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChallengeId(String);

impl ChallengeId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChallengeId({})", &self.0[..self.0.len().min(8)])
    }
}

// ── Jti ──────────────────────────────────────────────────────────────────────

/// JWT ID — unique identifier of one minted token.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
#[serde(transparent)]
pub struct Jti(String);

impl Jti {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Jti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Fingerprint ──────────────────────────────────────────────────────────────

/// SHA-256 hex digest of a normalised public key PEM. Globally unique across
/// all registered identities, revoked rows included.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn from_hex(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({}…)", &self.0[..self.0.len().min(16)])
    }
}

// ── Subject ──────────────────────────────────────────────────────────────────

/// Subject of a minted token. Empty or whitespace-only input coerces to the
/// guest user; ZKP mints pass the opaque identity id through unchanged.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
#[serde(transparent)]
pub struct Subject(String);

impl Subject {
    pub fn or_guest(raw: Option<&str>) -> Self {
        let trimmed = raw.unwrap_or("").trim();
        if trimmed.is_empty() {
            Self(GUEST_USER.to_string())
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_coerces_empty_to_guest() {
        assert_eq!(Subject::or_guest(None).as_str(), GUEST_USER);
        assert_eq!(Subject::or_guest(Some("")).as_str(), GUEST_USER);
        assert_eq!(Subject::or_guest(Some("   ")).as_str(), GUEST_USER);
        assert_eq!(Subject::or_guest(Some(" svc-a ")).as_str(), "svc-a");
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(IdentityId::generate(), IdentityId::generate());
        assert_ne!(ChallengeId::generate(), ChallengeId::generate());
        assert_ne!(Jti::generate().as_str(), Jti::generate().as_str());
    }
}
