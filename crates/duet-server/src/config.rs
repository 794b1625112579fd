//! Server configuration.
//!
//! Two layers, in priority order: compiled defaults, then `DUET_*`
//! environment variables. The binary's CLI flags override both.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Runtime configuration for the relay server.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    /// Address the HTTP/WebSocket listener binds to.
    pub bind_addr: SocketAddr,
    /// Path of the `SQLite` message log.
    pub db_path: PathBuf,
    /// Per-connection outbound channel capacity. A target whose channel is
    /// full drops that broadcast rather than stalling the sender.
    pub channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            db_path: PathBuf::from("duet.db"),
            channel_capacity: 64,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `DUET_BIND_ADDR`, `DUET_DB_PATH`, and
    /// `DUET_CHANNEL_CAPACITY` where set and parseable. Unparseable values
    /// are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("DUET_BIND_ADDR") {
            match raw.parse() {
                Ok(addr) => config.bind_addr = addr,
                Err(e) => tracing::warn!(value = %raw, error = %e, "ignoring DUET_BIND_ADDR"),
            }
        }
        if let Ok(raw) = std::env::var("DUET_DB_PATH") {
            config.db_path = PathBuf::from(raw);
        }
        if let Ok(raw) = std::env::var("DUET_CHANNEL_CAPACITY") {
            match raw.parse() {
                Ok(capacity) if capacity > 0 => config.channel_capacity = capacity,
                Ok(_) => tracing::warn!("ignoring DUET_CHANNEL_CAPACITY of 0"),
                Err(e) => {
                    tracing::warn!(value = %raw, error = %e, "ignoring DUET_CHANNEL_CAPACITY");
                }
            }
        }
        config
    }
}
