//! # duet-server
//!
//! Axum HTTP + WebSocket server for the Duet two-party relay.
//!
//! Routes:
//!
//! - `GET /ws?userId=…&partnerId=…` — join a session (WebSocket upgrade)
//! - `GET /health` — liveness plus connection/session counts
//! - `GET /metrics` — Prometheus text format
//!
//! All shared state — the [`SessionRegistry`], the message store, config —
//! is constructed at startup and threaded through [`AppState`]; nothing is
//! process-global except the tracing and metrics recorders.

#![deny(unsafe_code)]

pub mod config;
pub mod metrics;
pub mod websocket;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;

use duet_store::MessageStore;

pub use config::ServerConfig;
pub use websocket::{SessionRegistry, ws_upgrade};

/// Shared state handed to every handler and relay task.
#[derive(Clone)]
pub struct AppState {
    /// Live session membership.
    pub registry: Arc<SessionRegistry>,
    /// Durable message log.
    pub store: Arc<dyn MessageStore>,
    /// Runtime configuration.
    pub config: Arc<ServerConfig>,
    /// Metrics handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Build state around a store, with a fresh registry.
    pub fn new(store: Arc<dyn MessageStore>, config: ServerConfig) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            store,
            config: Arc::new(config),
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for the `/metrics` endpoint.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness endpoint with registry counts.
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "connections": state.registry.connection_count(),
        "sessions": state.registry.session_count().await,
    }))
}

/// Render Prometheus text, or 404 when no recorder is installed (tests).
async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => metrics::render(handle).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
