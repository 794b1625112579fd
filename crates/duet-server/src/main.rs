//! Server binary: config, tracing, metrics, store, listener.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mimalloc::MiMalloc;
use tracing::info;

use duet_server::{AppState, ServerConfig, router};
use duet_store::SqliteMessageStore;

/// Global allocator for improved performance.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Two-party WebSocket relay with durable history.
#[derive(Debug, Parser)]
#[command(name = "duet-server", version)]
struct Args {
    /// Address to bind (overrides DUET_BIND_ADDR).
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// SQLite database path (overrides DUET_DB_PATH).
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    duet_core::logging::init_tracing();

    let args = Args::parse();
    let mut config = ServerConfig::from_env();
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(db_path) = args.db_path {
        config.db_path = db_path;
    }

    let metrics_handle = duet_server::metrics::install_recorder();

    let store = SqliteMessageStore::open(&config.db_path)
        .with_context(|| format!("opening message store at {}", config.db_path.display()))?;
    info!(db_path = %config.db_path.display(), "message store opened");

    let bind_addr = config.bind_addr;
    let state = AppState::new(Arc::new(store), config).with_metrics(metrics_handle);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    info!(addr = %bind_addr, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        return;
    }
    info!("shutdown signal received");
}
