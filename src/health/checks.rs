//! The individual health checks.
//!
//! Connectivity and authentication probe the transport directly so a
//! health poll neither spends the outbound rate budget nor moves a breaker.

use tokio::time::Instant;

use crate::config::validation::{advisories, validate_config};
use crate::config::GatewayConfig;
use crate::gateway::client::GatewayClient;
use crate::gateway::error::GatewayError;
use crate::gateway::transport::AuthScope;
use crate::health::report::CheckResult;
use crate::resilience::CircuitState;

pub const CONNECTIVITY: &str = "connectivity";
pub const AUTHENTICATION: &str = "authentication";
pub const CONFIGURATION: &str = "configuration";
pub const PAYMENT_METHODS: &str = "payment_methods";
pub const RESILIENCE: &str = "resilience";

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Can the processor be reached at all, and how fast.
pub async fn connectivity(client: &GatewayClient) -> CheckResult {
    let health = &client.config().health;
    let segments: Vec<&str> = health
        .connectivity_path
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let started = Instant::now();
    let outcome = client.transport().get(&segments, AuthScope::Public).await;
    let took = elapsed_ms(started);

    match outcome {
        Ok(response) if !response.is_success() => {
            CheckResult::degraded(format!("processor answered HTTP {}", response.status)).timed(took)
        }
        Ok(_) if took > health.slow_response_ms => {
            CheckResult::degraded(format!("slow response ({} ms)", took)).timed(took)
        }
        Ok(response) => CheckResult::healthy(format!("reachable (HTTP {})", response.status)).timed(took),
        Err(failure) => CheckResult::unhealthy(format!("unreachable: {}", failure)).timed(took),
    }
}

/// Are the configured credentials accepted.
pub async fn authentication(client: &GatewayClient) -> CheckResult {
    let public_key = client.config().credentials.public_key.trim();
    if public_key.is_empty() {
        return CheckResult::unhealthy("public key not configured");
    }

    let started = Instant::now();
    let outcome = client
        .transport()
        .get(&["v1", "merchants", public_key], AuthScope::Private)
        .await
        .and_then(|response| response.into_result());
    let took = elapsed_ms(started);

    match outcome {
        Ok(_) => CheckResult::healthy("credentials accepted").timed(took),
        Err(failure) => match client.classifier().classify(failure) {
            GatewayError::Authentication { status } => {
                CheckResult::unhealthy(format!("credentials rejected (HTTP {})", status)).timed(took)
            }
            other => CheckResult::unhealthy(format!("credential check failed: {}", other)).timed(took),
        },
    }
}

/// Static configuration sanity, no network.
pub fn configuration(config: &GatewayConfig) -> CheckResult {
    if let Err(errors) = validate_config(config) {
        let detail = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return CheckResult::unhealthy(detail);
    }

    let notes = advisories(config);
    if notes.is_empty() {
        CheckResult::healthy(format!("valid ({} environment)", config.environment))
    } else {
        CheckResult::degraded(notes.join("; "))
    }
}

/// Does discovery return live data or the default list.
pub async fn payment_methods(client: &GatewayClient) -> CheckResult {
    let started = Instant::now();
    let outcome = client.get_payment_methods().await;
    let took = elapsed_ms(started);

    match outcome {
        Ok(methods) if methods.is_default => {
            CheckResult::degraded("serving default payment methods").timed(took)
        }
        Ok(methods) => {
            CheckResult::healthy(format!("{} methods available", methods.methods.len())).timed(took)
        }
        Err(err) => CheckResult::degraded(format!("discovery failed: {}", err)).timed(took),
    }
}

/// Breaker states and remaining outbound budget.
pub fn resilience(client: &GatewayClient) -> CheckResult {
    let mut tripped = Vec::new();
    let mut parts = Vec::new();
    for (group, snapshot) in client.breakers().snapshots() {
        parts.push(format!("{}={}", group.as_str(), snapshot.state.as_str()));
        if snapshot.state != CircuitState::Closed {
            tripped.push(group.as_str());
        }
    }

    let window = client.limiter().snapshot();
    let remaining = window.limit.saturating_sub(window.request_count);
    parts.push(format!("rate budget {}/{}", remaining, window.limit));
    let detail = parts.join(", ");

    if !tripped.is_empty() || remaining == 0 {
        CheckResult::degraded(detail)
    } else {
        CheckResult::healthy(detail)
    }
}
