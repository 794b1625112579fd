//! `SQLite` plumbing: pool construction, migrations, row types, repositories.

pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod row_types;

pub use connection::{ConnectionPool, PooledConnection, memory_pool, open_pool};
pub use migrations::run_migrations;
