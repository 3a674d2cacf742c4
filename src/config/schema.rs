//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway
//! client and its host service. All types derive Serde traits for
//! deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default sandbox API origin.
pub const SANDBOX_BASE_URL: &str = "https://sandbox.wompi.co";

/// Default production API origin.
pub const PRODUCTION_BASE_URL: &str = "https://production.wompi.co";

/// Root configuration for the payment gateway client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Merchant API credentials.
    pub credentials: Credentials,

    /// Processor environment (sandbox or production).
    pub environment: Environment,

    /// Explicit API origin. Derived from `environment` when unset.
    pub base_url: Option<String>,

    /// Per-attempt HTTP deadline in milliseconds.
    pub request_timeout_ms: u64,

    /// Currency advertised for discovered payment methods.
    pub default_currency: String,

    /// Outbound rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Circuit breaker thresholds.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Retry policy.
    pub retry: RetryConfig,

    /// Composite health check settings.
    pub health: HealthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Host service settings.
    pub service: ServiceConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            environment: Environment::Sandbox,
            base_url: None,
            request_timeout_ms: 5_000,
            default_currency: "COP".to_string(),
            rate_limit: RateLimitConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            retry: RetryConfig::default(),
            health: HealthConfig::default(),
            observability: ObservabilityConfig::default(),
            service: ServiceConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// API origin the client talks to.
    pub fn effective_base_url(&self) -> String {
        match &self.base_url {
            Some(url) if !url.trim().is_empty() => url.trim_end_matches('/').to_string(),
            _ => self.environment.default_base_url().to_string(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Processor environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Sandbox,
    Production,
}

impl Environment {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Environment::Sandbox => SANDBOX_BASE_URL,
            Environment::Production => PRODUCTION_BASE_URL,
        }
    }

    /// Key prefix segment the processor issues for this environment.
    pub fn key_tag(&self) -> &'static str {
        match self {
            Environment::Sandbox => "test",
            Environment::Production => "prod",
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" | "test" => Ok(Environment::Sandbox),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Sandbox => write!(f, "sandbox"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Merchant credentials. The private key never appears in `Debug` output.
#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Credentials {
    /// Public key, used as bearer for read endpoints.
    pub public_key: String,

    /// Private key, used for authenticated endpoints.
    pub private_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("public_key", &self.public_key)
            .field("private_key", &if self.private_key.is_empty() { "" } else { "<redacted>" })
            .finish()
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub limit: u32,

    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            window_ms: 60_000,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the breaker opens.
    pub failure_threshold: u32,

    /// Time an open breaker waits before allowing a probe, in milliseconds.
    pub reset_timeout_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_ms: 60_000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Retry-After fallback for 429 responses without the header.
    pub default_retry_after_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
            default_retry_after_ms: 1_000,
        }
    }
}

/// Composite health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Service name reported in the health report.
    pub service_name: String,

    /// Per-check deadline in milliseconds.
    pub check_timeout_ms: u64,

    /// Path probed by the connectivity check.
    pub connectivity_path: String,

    /// Connectivity responses slower than this are reported degraded.
    pub slow_response_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            service_name: "payment-gateway".to_string(),
            check_timeout_ms: 2_000,
            connectivity_path: "/v1/ping".to_string(),
            slow_response_ms: 1_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter directive used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Host service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Inbound request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}
