//! Metrics collection and exposition.
//!
//! # Metrics
//! - `harness_requests_total` (counter): requests by role, status
//! - `harness_request_duration_seconds` (histogram): handler latency by role
//! - `harness_injected_faults_total` (counter): simulated failures by cause
//! - `harness_upstream_transport_errors_total` (counter): proxy calls that never got a response

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(role: &'static str, status: u16, start_time: Instant) {
    counter!("harness_requests_total", "role" => role, "status" => status.to_string()).increment(1);
    histogram!("harness_request_duration_seconds", "role" => role)
        .record(start_time.elapsed().as_secs_f64());
}

/// Count a simulated failure. `cause` is `rate_limited` or `random_failure`.
pub fn record_fault(cause: &'static str) {
    counter!("harness_injected_faults_total", "cause" => cause).increment(1);
}

pub fn record_transport_error() {
    counter!("harness_upstream_transport_errors_total").increment(1);
}
