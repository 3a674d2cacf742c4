//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failed attempt is worth repeating
//! - Sleep with exponential backoff + jitter between attempts
//! - Bound the whole call with an outer deadline and honour cancellation
//!
//! # Design Decisions
//! - Only transient errors are retried (Network, 5xx, RateLimit)
//! - Breaker-agnostic: the pipeline records outcomes around each attempt
//! - Backoff sleeps suspend only the calling task

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::gateway::error::{GatewayError, GatewayResult, NetworkErrorKind};
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::cancel::CancelSignal;
use crate::resilience::timeouts::outer_deadline;

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            attempt_timeout,
        }
    }

    pub fn from_config(config: &RetryConfig, attempt_timeout: Duration) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            attempt_timeout,
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    pub fn outer_deadline(&self) -> Duration {
        outer_deadline(self.max_attempts, self.attempt_timeout, self.max_delay)
    }

    /// Delay after the `failures`-th failed attempt (1-based).
    pub fn delay_for(&self, failures: u32, err: &GatewayError) -> Duration {
        let backoff = calculate_backoff(
            failures.saturating_sub(1),
            self.base_delay.as_millis() as u64,
            self.max_delay.as_millis() as u64,
        );
        match err {
            GatewayError::RateLimit { retry_after_ms } => {
                backoff.max(Duration::from_millis(*retry_after_ms).min(self.max_delay))
            }
            _ => backoff,
        }
    }

    /// Run `attempt` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `attempt` receives the 1-based attempt number.
    pub async fn execute<T, F, Fut>(
        &self,
        operation: &'static str,
        cancel: &CancelSignal,
        attempt: F,
    ) -> GatewayResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let deadline = self.outer_deadline();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!(operation, "Gateway call cancelled by caller");
                Err(GatewayError::cancelled())
            }
            outcome = tokio::time::timeout(deadline, self.run(operation, attempt)) => match outcome {
                Ok(result) => result,
                Err(_) => {
                    tracing::error!(
                        operation,
                        deadline_ms = deadline.as_millis() as u64,
                        "Gateway call exceeded overall deadline"
                    );
                    Err(GatewayError::network(
                        NetworkErrorKind::DeadlineExceeded,
                        format!("{} exceeded {} ms", operation, deadline.as_millis()),
                    ))
                }
            }
        }
    }

    async fn run<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> GatewayResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let mut n = 0;
        loop {
            n += 1;
            match attempt(n).await {
                Ok(value) => {
                    if n > 1 {
                        tracing::info!(operation, attempt = n, "Gateway call recovered after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && n < self.max_attempts => {
                    let delay = self.delay_for(n, &err);
                    tracing::warn!(
                        operation,
                        attempt = n,
                        error_kind = err.kind(),
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying gateway call"
                    );
                    metrics::record_retry(operation, err.kind());
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    if err.is_retryable() {
                        tracing::warn!(
                            operation,
                            attempts = n,
                            error_kind = err.kind(),
                            error = %err,
                            "Retries exhausted"
                        );
                    } else {
                        tracing::warn!(
                            operation,
                            attempt = n,
                            error_kind = err.kind(),
                            error = %err,
                            "Gateway call failed with non-retryable error"
                        );
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::cancel::CancelHandle;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(
            3,
            Duration::from_millis(200),
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
    }

    async fn count_attempts(err: GatewayError) -> (GatewayResult<()>, u32) {
        let calls = AtomicU32::new(0);
        let result = policy()
            .execute("test", &CancelSignal::never(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                let err = err.clone();
                async move { Err::<(), _>(err) }
            })
            .await;
        (result, calls.load(Ordering::SeqCst))
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_retries_validation_or_auth() {
        let (result, calls) = count_attempts(GatewayError::validation("id", "bad")).await;
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(GatewayError::Validation { .. })));

        let (result, calls) = count_attempts(GatewayError::Authentication { status: 401 }).await;
        assert_eq!(calls, 1);
        assert_eq!(result, Err(GatewayError::Authentication { status: 401 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_up_to_max_attempts() {
        for err in [
            GatewayError::network(NetworkErrorKind::Connect, "refused"),
            GatewayError::Server { status: 503 },
            GatewayError::RateLimit { retry_after_ms: 10 },
        ] {
            let (result, calls) = count_attempts(err.clone()).await;
            assert_eq!(calls, 3, "{:?} should use every attempt", err);
            assert_eq!(result, Err(err));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_delays_strictly_increase() {
        let stamps = Arc::new(Mutex::new(Vec::new()));
        let policy = RetryPolicy::new(
            4,
            Duration::from_millis(200),
            Duration::from_secs(5),
            Duration::from_secs(5),
        );
        let _ = policy
            .execute("test", &CancelSignal::never(), |_| {
                stamps.lock().unwrap().push(Instant::now());
                async { Err::<(), _>(GatewayError::Server { status: 500 }) }
            })
            .await;

        let stamps = stamps.lock().unwrap();
        assert_eq!(stamps.len(), 4);
        let gaps: Vec<Duration> = stamps.windows(2).map(|w| w[1] - w[0]).collect();
        assert!(gaps[0] >= Duration::from_millis(200) && gaps[0] < Duration::from_millis(400));
        assert!(gaps.windows(2).all(|g| g[1] > g[0]), "gaps {:?}", gaps);
        assert!(gaps.iter().all(|g| *g < Duration::from_millis(5200)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = policy()
            .execute("test", &CancelSignal::never(), |n| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 3 {
                        Err(GatewayError::Server { status: 500 })
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;
        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_for_retry_after() {
        let p = policy();
        let delay = p.delay_for(1, &GatewayError::RateLimit { retry_after_ms: 3_000 });
        assert!(delay >= Duration::from_secs(3));

        let capped = p.delay_for(1, &GatewayError::RateLimit { retry_after_ms: 60_000 });
        assert!(capped <= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_retries() {
        let handle = CancelHandle::new();
        let signal = handle.signal();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let task = tokio::spawn(async move {
            policy()
                .execute("test", &signal, move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), _>(GatewayError::Server { status: 502 }) }
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.cancel();
        let result = task.await.unwrap();

        assert_eq!(result, Err(GatewayError::cancelled()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_outer_deadline_bounds_hung_attempts() {
        let policy = RetryPolicy::new(
            2,
            Duration::from_millis(10),
            Duration::from_millis(10),
            Duration::from_millis(100),
        );
        let result: GatewayResult<()> = policy
            .execute("test", &CancelSignal::never(), |_| async {
                std::future::pending::<()>().await;
                Ok(())
            })
            .await;

        assert!(matches!(
            result,
            Err(GatewayError::Network {
                kind: NetworkErrorKind::DeadlineExceeded,
                ..
            })
        ));
    }
}
