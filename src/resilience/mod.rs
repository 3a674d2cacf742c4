//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to processor:
//!     → rate_limit.rs (fixed-window outbound budget)
//!     → circuit_breaker.rs (fail fast while the endpoint group is open)
//!     → retries.rs (retry transient failures with backoff.rs delays)
//!     → timeouts.rs (deadline per attempt and per call)
//!     pipeline.rs composes the above; cancel.rs lets the caller stop it
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Only transient errors are retried
//! - Breaker and limiter are injected values, never globals

pub mod backoff;
pub mod cancel;
pub mod circuit_breaker;
pub mod pipeline;
pub mod rate_limit;
pub mod retries;
pub mod timeouts;

pub use cancel::{CancelHandle, CancelSignal};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerState, CircuitBreakers, CircuitState, EndpointGroup};
pub use pipeline::ResiliencePipeline;
pub use rate_limit::{RateLimitWindow, RateLimiter};
pub use retries::RetryPolicy;
