//! The async store seam consumed by the server.

pub mod message_store;

pub use message_store::{MessageStore, SqliteMessageStore};

#[cfg(feature = "test-util")]
pub use message_store::MockMessageStore;
