//! Raw row types as read from `SQLite`, before conversion to core types.

/// One row of the `messages` table.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageRow {
    /// Auto-assigned row id.
    pub id: i64,
    /// Sender participant id.
    pub sender_id: String,
    /// Recipient participant id.
    pub recipient_id: String,
    /// Text content.
    pub content: String,
    /// RFC 3339 UTC timestamp.
    pub timestamp: String,
    /// Canonical session id.
    pub session_id: String,
}
