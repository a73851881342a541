//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bff_requests_total` (counter): inbound requests by method, route, status
//! - `bff_request_duration_seconds` (histogram): inbound latency
//! - `bff_downstream_requests_total` (counter): outbound calls by backend, outcome
//! - `bff_downstream_duration_seconds` (histogram): outbound latency
//!
//! Recording is a no-op until [`init_metrics`] installs the Prometheus exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    metrics::counter!(
        "bff_requests_total",
        "method" => method.to_string(),
        "path" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "bff_request_duration_seconds",
        "method" => method.to_string(),
        "path" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_downstream(backend: &str, outcome: &'static str, start: Instant) {
    metrics::counter!(
        "bff_downstream_requests_total",
        "backend" => backend.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("bff_downstream_duration_seconds", "backend" => backend.to_string())
        .record(start.elapsed().as_secs_f64());
}
