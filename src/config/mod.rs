//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) and/or GATEWAY_* environment
//!     → loader.rs (parse, deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc with the client and health checks
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{
    CircuitBreakerConfig, Credentials, Environment, GatewayConfig, HealthConfig, LogFormat,
    ObservabilityConfig, RateLimitConfig, RetryConfig, ServiceConfig,
};
