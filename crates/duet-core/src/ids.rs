//! Branded identifier newtypes and the canonical session derivation.
//!
//! A session is keyed by the *unordered* pair of its participants:
//! [`SessionId::for_pair`] lexicographically orders the two identifiers and
//! joins them with `-`, so two independently-initiated connections (A
//! calling B, B calling A) land in the same session.

use serde::{Deserialize, Serialize};

use crate::errors::RelayError;

/// Separator between the ordered participant identifiers in a session id.
const SESSION_ID_SEPARATOR: char = '-';

/// An opaque, caller-supplied participant identifier.
///
/// Assumed non-empty and unique per participant; the relay performs no
/// identity verification beyond the emptiness check at pairing time.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Wrap a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty (and thus unusable for pairing).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Canonical identifier of a two-party session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Derive the canonical session id for an unordered participant pair.
    ///
    /// Commutative: `for_pair(a, b) == for_pair(b, a)` for all valid
    /// `a != b`. Fails with [`RelayError::InvalidPairing`] when either
    /// identifier is empty or the two are equal.
    pub fn for_pair(a: &ParticipantId, b: &ParticipantId) -> Result<Self, RelayError> {
        if a.is_empty() || b.is_empty() {
            return Err(RelayError::invalid_pairing(
                "missing userId or partnerId",
            ));
        }
        if a == b {
            return Err(RelayError::invalid_pairing(
                "sender and recipient ids cannot be the same",
            ));
        }
        let (lo, hi) = if a.as_str() < b.as_str() { (a, b) } else { (b, a) };
        Ok(Self(format!("{lo}{SESSION_ID_SEPARATOR}{hi}")))
    }

    /// Wrap an already-canonical session id, as read back from storage.
    ///
    /// Does not re-validate; storage only ever holds ids produced by
    /// [`Self::for_pair`].
    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw session id string (as stored and logged).
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
