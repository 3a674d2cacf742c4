//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): logical calls by operation, outcome
//! - `gateway_request_duration_seconds` (histogram): call latency incl. retries
//! - `gateway_retries_total` (counter): retries by operation, error kind
//! - `gateway_circuit_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `gateway_rate_limited_total` (counter): local rate limit rejections
//! - `gateway_fallback_total` (counter): degraded fallback responses
//! - `gateway_health_status` (gauge): 0=healthy, 1=degraded, 2=unhealthy
//!
//! Without an installed recorder every call is a no-op.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::health::report::HealthStatus;
use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_call(operation: &'static str, outcome: &'static str, started: Instant) {
    counter!("gateway_requests_total", "operation" => operation, "outcome" => outcome).increment(1);
    histogram!("gateway_request_duration_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_retry(operation: &'static str, error_kind: &'static str) {
    counter!("gateway_retries_total", "operation" => operation, "error_kind" => error_kind).increment(1);
}

pub fn record_circuit_state(group: &'static str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    gauge!("gateway_circuit_state", "group" => group).set(value);
}

pub fn record_rate_limited() {
    counter!("gateway_rate_limited_total").increment(1);
}

pub fn record_fallback(operation: &'static str) {
    counter!("gateway_fallback_total", "operation" => operation).increment(1);
}

pub fn record_health(status: HealthStatus) {
    let value = match status {
        HealthStatus::Healthy => 0.0,
        HealthStatus::Degraded => 1.0,
        HealthStatus::Unhealthy => 2.0,
    };
    gauge!("gateway_health_status").set(value);
}
