//! Outbound request rate limiting.
//!
//! Fixed window counter: at most `limit` acquisitions per `window_duration`,
//! with the counter reset at each window boundary. One mutex guards the
//! window so concurrent `acquire` calls never lose updates.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::gateway::error::{GatewayError, GatewayResult};
use crate::observability::metrics;

/// Current window bookkeeping.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitWindow {
    pub window_start: Instant,
    pub request_count: u32,
    pub limit: u32,
    pub window_duration: Duration,
}

impl RateLimitWindow {
    /// Advance to the window containing `now`, resetting the counter.
    fn roll(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.window_duration {
            return;
        }
        let window_ms = self.window_duration.as_millis().max(1);
        let periods = elapsed.as_millis() / window_ms;
        self.window_start = match u32::try_from(periods) {
            Ok(n) => self.window_start + self.window_duration * n,
            Err(_) => now,
        };
        self.request_count = 0;
    }

    fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.request_count)
    }

    fn until_reset(&self, now: Instant) -> Duration {
        (self.window_start + self.window_duration).saturating_duration_since(now)
    }
}

/// Shared outbound rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    window: Mutex<RateLimitWindow>,
}

impl RateLimiter {
    pub fn new(limit: u32, window_duration: Duration) -> Self {
        Self {
            window: Mutex::new(RateLimitWindow {
                window_start: Instant::now(),
                request_count: 0,
                limit,
                window_duration,
            }),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.limit, Duration::from_millis(config.window_ms))
    }

    /// Take one slot from the current window.
    pub fn acquire(&self) -> GatewayResult<()> {
        let now = Instant::now();
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        window.roll(now);

        if window.request_count < window.limit {
            window.request_count += 1;
            return Ok(());
        }

        let retry_after_ms = window.until_reset(now).as_millis() as u64;
        drop(window);

        tracing::warn!(retry_after_ms, "Outbound rate limit exceeded");
        metrics::record_rate_limited();
        Err(GatewayError::RateLimit { retry_after_ms })
    }

    /// Slots left in the current window.
    pub fn remaining(&self) -> u32 {
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        window.roll(Instant::now());
        window.remaining()
    }

    pub fn snapshot(&self) -> RateLimitWindow {
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        window.roll(Instant::now());
        *window
    }
}
