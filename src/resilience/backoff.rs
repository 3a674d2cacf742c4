//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Delay before retry number `attempt + 1`, where `attempt` counts completed
/// failures from zero:
///
/// `min(base * 2^attempt, max) + jitter(0, base)`
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let (floor, _) = backoff_bounds(attempt, base_ms, max_ms);
    let jitter = if base_ms > 0 {
        rand::thread_rng().gen_range(0..base_ms)
    } else {
        0
    };

    floor + Duration::from_millis(jitter)
}

/// Inclusive lower and exclusive upper bound of `calculate_backoff`.
pub fn backoff_bounds(attempt: u32, base_ms: u64, max_ms: u64) -> (Duration, Duration) {
    let exponential = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
    let capped = base_ms.saturating_mul(exponential).min(max_ms);
    (
        Duration::from_millis(capped),
        Duration::from_millis(capped.saturating_add(base_ms.max(1))),
    )
}
