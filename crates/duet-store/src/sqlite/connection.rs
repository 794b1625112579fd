//! Connection pool construction.
//!
//! Every pooled connection gets the same PRAGMA setup: WAL journaling for
//! concurrent reader/writer access, foreign keys on, and a busy timeout so
//! writers queue instead of failing immediately.

use std::path::Path;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::errors::Result;

/// Pool of `SQLite` connections.
pub type ConnectionPool = r2d2::Pool<SqliteConnectionManager>;

/// A connection checked out of the pool.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

fn configure(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )
}

/// Open (creating if needed) a pooled database at `path` and run migrations.
pub fn open_pool(path: &Path) -> Result<ConnectionPool> {
    let manager = SqliteConnectionManager::file(path).with_init(configure);
    let pool = r2d2::Pool::builder().build(manager)?;
    crate::sqlite::migrations::run_migrations(&*pool.get()?)?;
    Ok(pool)
}

/// In-memory pool for tests.
///
/// Capped at one connection: each in-memory `SQLite` connection is its own
/// database, so a larger pool would hand out empty databases.
pub fn memory_pool() -> Result<ConnectionPool> {
    let manager = SqliteConnectionManager::memory().with_init(configure);
    let pool = r2d2::Pool::builder().max_size(1).build(manager)?;
    crate::sqlite::migrations::run_migrations(&*pool.get()?)?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_pool_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.db");
        let pool = open_pool(&path).unwrap();
        let _conn = pool.get().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn memory_pool_is_migrated() {
        let pool = memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
