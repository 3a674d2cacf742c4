//! Runs the health checks and folds them into one report.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use crate::gateway::client::GatewayClient;
use crate::health::checks;
use crate::health::report::{CheckResult, HealthReport, HealthStatus};
use crate::observability::metrics;

/// Composite health check over one client.
pub struct HealthAggregator<'a> {
    client: &'a GatewayClient,
}

impl<'a> HealthAggregator<'a> {
    pub fn new(client: &'a GatewayClient) -> Self {
        Self { client }
    }

    /// Run every check concurrently. Never fails; a check that errors or
    /// times out becomes a failing entry in the report.
    pub async fn run(&self) -> HealthReport {
        let config = self.client.config();
        let deadline = Duration::from_millis(config.health.check_timeout_ms);

        let (connectivity, authentication, payment_methods) = tokio::join!(
            bounded(
                checks::CONNECTIVITY,
                deadline,
                HealthStatus::Unhealthy,
                checks::connectivity(self.client)
            ),
            bounded(
                checks::AUTHENTICATION,
                deadline,
                HealthStatus::Unhealthy,
                checks::authentication(self.client)
            ),
            bounded(
                checks::PAYMENT_METHODS,
                deadline,
                HealthStatus::Degraded,
                checks::payment_methods(self.client)
            ),
        );

        let mut results = BTreeMap::new();
        results.insert(checks::CONNECTIVITY.to_string(), connectivity);
        results.insert(checks::AUTHENTICATION.to_string(), authentication);
        results.insert(checks::CONFIGURATION.to_string(), checks::configuration(config));
        results.insert(checks::PAYMENT_METHODS.to_string(), payment_methods);
        results.insert(checks::RESILIENCE.to_string(), checks::resilience(self.client));

        for (name, result) in &results {
            if result.status != HealthStatus::Healthy {
                tracing::warn!(check = %name, status = %result.status, detail = %result.detail, "Health check not healthy");
            }
        }

        let report = HealthReport::new(config.health.service_name.clone(), results);
        metrics::record_health(report.status);
        tracing::debug!(status = %report.status, "Health report computed");
        report
    }
}

async fn bounded<F>(name: &'static str, deadline: Duration, on_timeout: HealthStatus, check: F) -> CheckResult
where
    F: Future<Output = CheckResult>,
{
    match tokio::time::timeout(deadline, check).await {
        Ok(result) => result,
        Err(_) => {
            let ms = deadline.as_millis() as u64;
            tracing::warn!(check = name, timeout_ms = ms, "Health check timed out");
            CheckResult::new(on_timeout, format!("timed out after {} ms", ms)).timed(ms)
        }
    }
}
