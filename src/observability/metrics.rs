//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_dispatch_total` (counter): dispatch outcomes (`matched`, `unmatched`, `fault`)
//! - `router_link_generation_total` (counter): link outcomes (`generated`, `none`)
//! - `router_version` (gauge): version of the published router
//! - `http_requests_total` (counter): front-end responses by status
//! - `http_request_duration_seconds` (histogram): front-end latency
//!
//! # Design Decisions
//! - Routing code records through the `metrics` macros directly
//! - The Prometheus exporter is installed only when enabled in config

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one front-end response.
pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    metrics::counter!("http_requests_total", "method" => method.to_string(), "status" => status.clone())
        .increment(1);
    metrics::histogram!("http_request_duration_seconds", "status" => status)
        .record(start.elapsed().as_secs_f64());
}
