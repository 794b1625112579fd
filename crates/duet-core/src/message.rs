//! The persisted message unit.
//!
//! Records are stored flat, with RFC 3339 UTC timestamps as strings. The
//! row id is assigned by storage and is `None` until a record has been
//! appended.

use serde::{Deserialize, Serialize};

use crate::ids::{ParticipantId, SessionId};

/// A message accepted by the relay, ready to persist.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    /// Participant the message came from.
    pub sender_id: ParticipantId,
    /// Partner captured at join time.
    pub recipient_id: ParticipantId,
    /// Decoded text content.
    pub content: String,
    /// Relay-assigned send time, RFC 3339 UTC.
    pub timestamp: String,
    /// Session the message belongs to.
    pub session_id: SessionId,
}

impl NewMessage {
    /// Build a record stamped with the current UTC time.
    pub fn now(
        sender_id: ParticipantId,
        recipient_id: ParticipantId,
        content: impl Into<String>,
        session_id: SessionId,
    ) -> Self {
        Self {
            sender_id,
            recipient_id,
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            session_id,
        }
    }
}

/// A persisted message, as returned by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    /// Storage-assigned row id.
    pub id: i64,
    /// Participant the message came from.
    pub sender_id: ParticipantId,
    /// Partner captured at join time.
    pub recipient_id: ParticipantId,
    /// Decoded text content.
    pub content: String,
    /// Relay-assigned send time, RFC 3339 UTC.
    pub timestamp: String,
    /// Session the message belongs to.
    pub session_id: SessionId,
}
