//! WebSocket relay: connection lifecycle, session membership, fan-out.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `connection` | Upgrade, validation, history replay, relay loop, close |
//! | `registry` | Session membership: join/leave, snapshot-for-broadcast |
//!
//! ## Data Flow
//!
//! `connection` validates and joins → replays history → each inbound
//! message is persisted, then fanned out via `registry` snapshots to every
//! other connection in the session.

pub mod connection;
pub mod registry;

pub use connection::{JoinParams, RelayConnection, ws_upgrade};
pub use registry::SessionRegistry;
