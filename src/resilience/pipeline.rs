//! Composition of the resilience layers around a single processor call.
//!
//! ```text
//! RateLimiter::acquire ─▶ CircuitBreaker::try_acquire ─▶ RetryPolicy::execute
//!                                                            │ per attempt:
//!                                                            ├─ stop if breaker opened meanwhile
//!                                                            ├─ with_timeout(attempt_timeout)
//!                                                            └─ record outcome on the breaker
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use crate::config::GatewayConfig;
use crate::gateway::error::{GatewayError, GatewayResult};
use crate::observability::metrics;
use crate::resilience::cancel::CancelSignal;
use crate::resilience::circuit_breaker::{BreakerPermit, CircuitBreakers, EndpointGroup};
use crate::resilience::rate_limit::RateLimiter;
use crate::resilience::retries::RetryPolicy;
use crate::resilience::timeouts::with_timeout;

/// Shared limiter, breakers and retry policy.
#[derive(Debug, Clone)]
pub struct ResiliencePipeline {
    limiter: Arc<RateLimiter>,
    breakers: Arc<CircuitBreakers>,
    retry: RetryPolicy,
}

impl ResiliencePipeline {
    pub fn new(limiter: Arc<RateLimiter>, breakers: Arc<CircuitBreakers>, retry: RetryPolicy) -> Self {
        Self {
            limiter,
            breakers,
            retry,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            Arc::new(RateLimiter::from_config(&config.rate_limit)),
            Arc::new(CircuitBreakers::new(config.circuit_breaker.clone())),
            RetryPolicy::from_config(&config.retry, config.request_timeout()),
        )
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakers> {
        &self.breakers
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Run `call` through rate limiting, circuit breaking and retries.
    pub async fn call<T, F, Fut>(
        &self,
        group: EndpointGroup,
        operation: &'static str,
        cancel: &CancelSignal,
        mut call: F,
    ) -> GatewayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let started = Instant::now();
        let result = self.guarded(group, operation, cancel, &mut call).await;
        metrics::record_call(operation, outcome_label(&result), started);
        result
    }

    async fn guarded<T, F, Fut>(
        &self,
        group: EndpointGroup,
        operation: &'static str,
        cancel: &CancelSignal,
        call: &mut F,
    ) -> GatewayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        self.limiter.acquire()?;

        let breaker = self.breakers.get(group);
        let Some(permit) = breaker.try_acquire() else {
            tracing::warn!(operation, group = group.as_str(), "Circuit open, failing fast");
            return Err(GatewayError::CircuitOpen {
                group: group.as_str(),
            });
        };
        if permit.is_probe() {
            tracing::info!(operation, group = group.as_str(), "Sending half-open probe");
        }

        let permit = &permit;
        let attempt_timeout = self.retry.attempt_timeout();

        self.retry
            .execute(operation, cancel, |attempt| {
                let tripped = attempt > 1 && !permit.is_current();
                let fut = if tripped { None } else { Some(call()) };
                async move {
                    let Some(fut) = fut else {
                        return Err(GatewayError::CircuitOpen {
                            group: group.as_str(),
                        });
                    };
                    let result = with_timeout(attempt_timeout, fut).await;
                    record_outcome(permit, &result);
                    result
                }
            })
            .await
    }
}

fn record_outcome<T>(permit: &BreakerPermit, result: &GatewayResult<T>) {
    match result {
        Ok(_) => permit.record_success(),
        Err(err) if err.counts_as_breaker_failure() => permit.record_failure(),
        // The processor answered; it is reachable even if the input was bad.
        Err(GatewayError::Validation { .. }) => permit.record_success(),
        Err(_) => {}
    }
}

fn outcome_label<T>(result: &GatewayResult<T>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(err) => err.kind(),
    }
}
