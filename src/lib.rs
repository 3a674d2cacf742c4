//! Resilient payment-gateway client.
//!
//! Queries transaction status, discovers payment methods and reports health
//! against an external card/PSE processor, behind a rate limiter, per-endpoint
//! circuit breakers and bounded retries.

pub mod config;
pub mod gateway;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::GatewayConfig;
pub use gateway::{GatewayClient, GatewayError, GatewayResult};
pub use health::{HealthReport, HealthStatus};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use resilience::{CancelHandle, CancelSignal};
