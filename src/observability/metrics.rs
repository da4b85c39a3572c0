//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): responses by method, status
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_rate_limited_total` (counter): denied admissions
//! - `gateway_backend_failures_total` (counter): backend errors by kind
//! - `gateway_rate_limit_buckets` (gauge): live client buckets

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("gateway_requests_total", &labels).increment(1);
    metrics::histogram!("gateway_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    metrics::counter!("gateway_rate_limited_total").increment(1);
}

pub fn record_backend_failure(kind: &'static str) {
    metrics::counter!("gateway_backend_failures_total", "kind" => kind).increment(1);
}

pub fn record_bucket_count(count: usize) {
    metrics::gauge!("gateway_rate_limit_buckets").set(count as f64);
}
