//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! GatewayClient::health_check()
//!     → aggregator.rs (run checks concurrently, each with its own deadline)
//!     → checks.rs (connectivity, authentication, configuration,
//!                  payment_methods, resilience)
//!     → report.rs (reduce: worst status wins)
//! ```
//!
//! # Design Decisions
//! - Reports are recomputed on every call, never cached
//! - A failing or hung check becomes a failing entry, never an error

pub mod aggregator;
pub mod checks;
pub mod report;

pub use aggregator::HealthAggregator;
pub use report::{CheckResult, HealthReport, HealthStatus};
