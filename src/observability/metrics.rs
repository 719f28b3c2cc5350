//! Metrics collection and exposition.
//!
//! # Metrics
//! - `redirector_redirects_total` (counter): redirects issued, by status
//! - `redirector_misses_total` (counter): 404s with no redirect
//! - `redirector_duplicate_routes_total` (counter): rejected collisions
//! - `redirector_dynamic_source_errors_total` (counter): failed lookups
//! - `redirector_resolve_duration_seconds` (histogram): resolution latency
//!
//! # Design Decisions
//! - Low-overhead metric updates through the `metrics` facade
//! - Prometheus exporter runs its own listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_redirect(status: u16) {
    counter!("redirector_redirects_total", "status" => status.to_string()).increment(1);
}

pub fn record_miss() {
    counter!("redirector_misses_total").increment(1);
}

pub fn record_duplicate_routes() {
    counter!("redirector_duplicate_routes_total").increment(1);
}

pub fn record_dynamic_source_error() {
    counter!("redirector_dynamic_source_errors_total").increment(1);
}

pub fn record_resolve_duration(start: Instant) {
    histogram!("redirector_resolve_duration_seconds").record(start.elapsed().as_secs_f64());
}
