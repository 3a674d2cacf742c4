//! Timeout enforcement.
//!
//! Every processor call has a deadline: one per HTTP attempt, and an outer
//! one bounding a whole retried call. Elapsed deadlines surface as
//! `Network` errors so the retry policy treats them as transient.

use std::future::Future;
use std::time::Duration;

use crate::gateway::error::{GatewayError, GatewayResult, NetworkErrorKind};

/// Run one attempt under `deadline`.
pub async fn with_timeout<T, F>(deadline: Duration, fut: F) -> GatewayResult<T>
where
    F: Future<Output = GatewayResult<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::network(
            NetworkErrorKind::Timeout,
            format!("attempt exceeded {} ms", deadline.as_millis()),
        )),
    }
}

/// Worst-case bound for a retried call: `max_attempts * (timeout + max_delay)`.
pub fn outer_deadline(max_attempts: u32, attempt_timeout: Duration, max_delay: Duration) -> Duration {
    (attempt_timeout + max_delay).saturating_mul(max_attempts.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_is_network_error() {
        let result: GatewayResult<()> = with_timeout(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        })
        .await;

        assert!(matches!(
            result,
            Err(GatewayError::Network {
                kind: NetworkErrorKind::Timeout,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_fast_attempt_passes_through() {
        let result = with_timeout(Duration::from_secs(1), async { Ok::<_, GatewayError>(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[test]
    fn test_outer_deadline() {
        let d = outer_deadline(3, Duration::from_secs(5), Duration::from_secs(5));
        assert_eq!(d, Duration::from_secs(30));
    }
}
