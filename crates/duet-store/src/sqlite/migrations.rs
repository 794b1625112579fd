//! Schema migrations.
//!
//! The schema is append-only and small enough for a single idempotent
//! batch. Timestamps are RFC 3339 UTC strings, so lexicographic ordering
//! matches chronological ordering within the index.

use rusqlite::Connection;

use crate::errors::Result;

/// Create the schema if it does not exist. Idempotent.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS messages (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            sender_id    TEXT NOT NULL,
            recipient_id TEXT NOT NULL,
            content      TEXT NOT NULL,
            timestamp    TEXT NOT NULL,
            session_id   TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_messages_session_timestamp
            ON messages (session_id, timestamp);",
    )?;
    Ok(())
}
