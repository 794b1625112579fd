//! # duet-store
//!
//! Append-only SQLite persistence for relay messages.
//!
//! The server consumes the [`store::MessageStore`] trait — two operations,
//! `append` and `history` — and never touches SQL. The default
//! implementation, [`store::SqliteMessageStore`], runs `rusqlite` work on
//! the blocking thread pool behind an `r2d2` connection pool.
//!
//! Layering mirrors the repository pattern: [`sqlite::repositories`] hold
//! stateless SQL against `&Connection`, [`store`] composes them behind the
//! async seam.

#![deny(unsafe_code)]

pub mod errors;
pub mod sqlite;
pub mod store;

pub use errors::{Result, StoreError};
pub use store::{MessageStore, SqliteMessageStore};

#[cfg(feature = "test-util")]
pub use store::MockMessageStore;
