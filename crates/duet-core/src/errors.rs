//! The [`RelayError`] hierarchy.
//!
//! One variant per failure class the relay distinguishes. Recovery policy
//! lives with the caller: `InvalidPairing` closes the connection before it
//! joins anything, `MalformedContent` drops a single message, and transport
//! failures are scoped to the one connection that produced them.

use thiserror::Error;

/// Errors produced by the relay core.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The two participant identifiers cannot form a session.
    #[error("invalid pairing: {reason}")]
    InvalidPairing {
        /// Human-readable reason, also sent to the peer before close.
        reason: String,
    },

    /// An inbound frame's payload was not a JSON object with a string
    /// `content` field.
    #[error("malformed message content: {0}")]
    MalformedContent(String),

    /// Sending or receiving on a specific connection failed.
    #[error("transport error: {0}")]
    Transport(String),
}

impl RelayError {
    /// Build an `InvalidPairing` error.
    pub fn invalid_pairing(reason: impl Into<String>) -> Self {
        Self::InvalidPairing { reason: reason.into() }
    }
}
