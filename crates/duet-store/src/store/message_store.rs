//! The [`MessageStore`] trait and its `SQLite` implementation.
//!
//! `rusqlite` is synchronous, so [`SqliteMessageStore`] pushes every query
//! through [`tokio::task::spawn_blocking`]. The await inside `append` and
//! `history` is the relay's only persistence suspension point — a slow
//! history fetch parks this connection's task, not a worker thread.

use async_trait::async_trait;
use tracing::debug;

use duet_core::{MessageRecord, NewMessage, ParticipantId, SessionId};

use crate::errors::{Result, StoreError};
use crate::sqlite::repositories::message::{InsertMessageOptions, MessageRepo};
use crate::sqlite::row_types::MessageRow;
use crate::sqlite::{ConnectionPool, memory_pool, open_pool};

/// Append-only message log, queryable per session.
#[cfg_attr(feature = "test-util", mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Durably persist one message; returns the stored record with its
    /// assigned row id.
    async fn append(&self, message: NewMessage) -> Result<MessageRecord>;

    /// Full history for a session, ascending by timestamp.
    async fn history(&self, session_id: &SessionId) -> Result<Vec<MessageRecord>>;
}

/// `SQLite`-backed [`MessageStore`].
#[derive(Clone)]
pub struct SqliteMessageStore {
    pool: ConnectionPool,
}

impl SqliteMessageStore {
    /// Open (creating if needed) a store at `path`; runs migrations.
    pub fn open(path: &std::path::Path) -> Result<Self> {
        Ok(Self { pool: open_pool(path)? })
    }

    /// In-memory store. Each instance is its own database.
    pub fn in_memory() -> Result<Self> {
        Ok(Self { pool: memory_pool()? })
    }

    /// Wrap an existing pool (assumed migrated).
    pub fn from_pool(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Internal(format!("blocking task failed: {e}")))?
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn append(&self, message: NewMessage) -> Result<MessageRecord> {
        let record = self
            .run_blocking(move |conn| {
                MessageRepo::insert(
                    conn,
                    &InsertMessageOptions {
                        sender_id: message.sender_id.as_str(),
                        recipient_id: message.recipient_id.as_str(),
                        content: &message.content,
                        timestamp: &message.timestamp,
                        session_id: message.session_id.as_str(),
                    },
                )
            })
            .await?;
        debug!(id = record.id, session_id = %record.session_id, "message appended");
        Ok(record.into())
    }

    async fn history(&self, session_id: &SessionId) -> Result<Vec<MessageRecord>> {
        let session = session_id.as_str().to_owned();
        let rows = self
            .run_blocking(move |conn| MessageRepo::list_by_session(conn, &session))
            .await?;
        Ok(rows.into_iter().map(MessageRow::into).collect())
    }
}

impl From<MessageRow> for MessageRecord {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            sender_id: ParticipantId::new(row.sender_id),
            recipient_id: ParticipantId::new(row.recipient_id),
            content: row.content,
            timestamp: row.timestamp,
            session_id: SessionId::from_raw(row.session_id),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
