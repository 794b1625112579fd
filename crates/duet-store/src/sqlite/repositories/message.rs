//! Message repository — inserts and session-scoped reads of the
//! `messages` table.
//!
//! Rows are never updated or deleted here; retention is an external
//! concern.

use rusqlite::{Connection, params};

use crate::errors::Result;
use crate::sqlite::row_types::MessageRow;

/// Options for inserting a message.
pub struct InsertMessageOptions<'a> {
    /// Sender participant id.
    pub sender_id: &'a str,
    /// Recipient participant id.
    pub recipient_id: &'a str,
    /// Text content.
    pub content: &'a str,
    /// RFC 3339 UTC timestamp, assigned by the relay.
    pub timestamp: &'a str,
    /// Canonical session id.
    pub session_id: &'a str,
}

/// Message repository — stateless, every method takes `&Connection`.
pub struct MessageRepo;

impl MessageRepo {
    /// Insert one message, returning the stored row with its assigned id.
    pub fn insert(conn: &Connection, opts: &InsertMessageOptions<'_>) -> Result<MessageRow> {
        let _ = conn.execute(
            "INSERT INTO messages (sender_id, recipient_id, content, timestamp, session_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                opts.sender_id,
                opts.recipient_id,
                opts.content,
                opts.timestamp,
                opts.session_id
            ],
        )?;
        Ok(MessageRow {
            id: conn.last_insert_rowid(),
            sender_id: opts.sender_id.to_string(),
            recipient_id: opts.recipient_id.to_string(),
            content: opts.content.to_string(),
            timestamp: opts.timestamp.to_string(),
            session_id: opts.session_id.to_string(),
        })
    }

    /// All messages for a session, ascending by timestamp (row id breaks ties).
    pub fn list_by_session(conn: &Connection, session_id: &str) -> Result<Vec<MessageRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, sender_id, recipient_id, content, timestamp, session_id
             FROM messages WHERE session_id = ?1 ORDER BY timestamp ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![session_id], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Count messages for a session.
    pub fn count_by_session(conn: &Connection, session_id: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
        Ok(MessageRow {
            id: row.get(0)?,
            sender_id: row.get(1)?,
            recipient_id: row.get(2)?,
            content: row.get(3)?,
            timestamp: row.get(4)?,
            session_id: row.get(5)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
