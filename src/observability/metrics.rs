//! Metrics collection and exposition.
//!
//! # Metrics
//! - `protomux_dispatch_total` (counter): classified connections by decision
//! - `protomux_faults_total` (counter): connection-scoped faults by kind
//! - `protomux_ws_messages_total` (counter): WebSocket messages by direction
//! - `protomux_active_connections` (gauge): current connection count
//!
//! Updates go through the `metrics` facade and are no-ops until a recorder is
//! installed with [`init_metrics`].

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_dispatch(decision: &'static str) {
    metrics::counter!("protomux_dispatch_total", "decision" => decision).increment(1);
}

pub fn record_fault(kind: &'static str) {
    metrics::counter!("protomux_faults_total", "kind" => kind).increment(1);
}

/// `direction` is either `"inbound"` or `"outbound"`.
pub fn record_ws_message(direction: &'static str) {
    metrics::counter!("protomux_ws_messages_total", "direction" => direction).increment(1);
}

pub fn set_active_connections(count: u64) {
    metrics::gauge!("protomux_active_connections").set(count as f64);
}
