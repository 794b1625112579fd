//! # duet-core
//!
//! Foundation types for the Duet two-party message relay.
//!
//! This crate provides the shared vocabulary the store and server crates
//! depend on:
//!
//! - **Branded IDs**: [`ids::ParticipantId`] and [`ids::SessionId`] as
//!   newtypes, with the canonical unordered-pair derivation
//! - **Messages**: [`message::MessageRecord`], the persisted unit
//! - **Errors**: [`errors::RelayError`] hierarchy via `thiserror`
//! - **Logging**: [`logging::init_tracing`] subscriber setup
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by `duet-store` and `duet-server`.

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod logging;
pub mod message;

pub use errors::RelayError;
pub use ids::{ParticipantId, SessionId};
pub use message::{MessageRecord, NewMessage};
