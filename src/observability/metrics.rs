//! Metrics collection and exposition.
//!
//! # Metrics
//! - `shadow_requests_total` (counter): production-leg requests by method, status
//! - `shadow_request_duration_seconds` (histogram): production-leg latency
//! - `shadow_staging_total` (counter): staging tasks by outcome
//! - `shadow_staging_in_flight` (gauge): staging tasks currently running
//! - `shadow_store_errors_total` (counter): cookie store failures by operation, kind
//! - `shadow_session_rotations_total` (counter): production session id rotations
//!
//! # Design Decisions
//! - Uses the `metrics` facade; without an installed recorder every call is a no-op
//! - Prometheus exporter serves its own HTTP listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed production-leg request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "shadow_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("shadow_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record how a staging task ended.
pub fn record_staging(outcome: &'static str) {
    counter!("shadow_staging_total", "outcome" => outcome).increment(1);
}

/// Update the in-flight staging gauge.
pub fn record_staging_in_flight(count: usize) {
    gauge!("shadow_staging_in_flight").set(count as f64);
}

pub fn record_store_error(operation: &'static str, kind: &'static str) {
    counter!("shadow_store_errors_total", "operation" => operation, "kind" => kind).increment(1);
}

pub fn record_session_rotation() {
    counter!("shadow_session_rotations_total").increment(1);
}
