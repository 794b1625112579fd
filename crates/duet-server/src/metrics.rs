//! Prometheus metrics recorder and `/metrics` endpoint handler.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Must be called once at server startup before any metrics are recorded.
pub fn install_recorder() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install metrics recorder");
    info!("prometheus metrics recorder installed");
    handle
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants to avoid typos across modules.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Join requests rejected during validation (counter).
pub const RELAY_VALIDATION_FAILURES_TOTAL: &str = "relay_validation_failures_total";
/// Messages relayed (persist + fan-out attempted) total (counter).
pub const RELAY_MESSAGES_TOTAL: &str = "relay_messages_total";
/// History records replayed to joining connections (counter).
pub const RELAY_REPLAYED_RECORDS_TOTAL: &str = "relay_replayed_records_total";
/// Per-target broadcast delivery failures (counter).
pub const RELAY_BROADCAST_FAILURES_TOTAL: &str = "relay_broadcast_failures_total";
/// Inbound frames dropped as malformed (counter).
pub const RELAY_MALFORMED_FRAMES_TOTAL: &str = "relay_malformed_frames_total";
/// Store append failures tolerated during relay (counter).
pub const STORE_APPEND_FAILURES_TOTAL: &str = "store_append_failures_total";
