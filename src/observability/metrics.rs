//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gatelink_requests_total` (counter): REST calls by method, status
//! - `gatelink_request_duration_seconds` (histogram): REST latency per attempt
//! - `gatelink_throttled_total` (counter): 429 responses
//! - `gatelink_gateway_state` (gauge): numeric session state
//! - `gatelink_heartbeat_latency_seconds` (histogram): HEARTBEAT → ACK
//! - `gatelink_reconnects_total` (counter): reconnects by reason
//!
//! The recorders are no-ops until `init_metrics` installs the exporter.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "gatelink_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gatelink_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_throttled(method: &str) {
    counter!("gatelink_throttled_total", "method" => method.to_string()).increment(1);
}

pub fn record_gateway_state(state: u8) {
    gauge!("gatelink_gateway_state").set(f64::from(state));
}

pub fn record_heartbeat_latency(latency: Duration) {
    histogram!("gatelink_heartbeat_latency_seconds").record(latency.as_secs_f64());
}

pub fn record_reconnect(reason: &'static str) {
    counter!("gatelink_reconnects_total", "reason" => reason).increment(1);
}
