//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {reason}")]
    Env { var: &'static str, reason: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("HTTP client error: {0}")]
    Client(String),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from a TOML file, apply environment overrides, validate.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: GatewayConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build configuration from defaults plus `GATEWAY_*` environment variables.
pub fn load_from_env() -> Result<GatewayConfig, ConfigError> {
    let mut config = GatewayConfig::default();

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Override file values with environment values.
///
/// `lookup` abstracts the environment so callers can inject a map.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("GATEWAY_PUBLIC_KEY") {
        config.credentials.public_key = v;
    }
    if let Some(v) = lookup("GATEWAY_PRIVATE_KEY") {
        config.credentials.private_key = v;
    }
    if let Some(v) = lookup("GATEWAY_BASE_URL") {
        config.base_url = Some(v);
    }
    if let Some(v) = lookup("GATEWAY_ENVIRONMENT") {
        config.environment = v.parse().map_err(|reason| ConfigError::Env {
            var: "GATEWAY_ENVIRONMENT",
            reason,
        })?;
    }

    override_num(&lookup, "GATEWAY_REQUEST_TIMEOUT_MS", &mut config.request_timeout_ms)?;
    override_num(&lookup, "GATEWAY_RATE_LIMIT", &mut config.rate_limit.limit)?;
    override_num(&lookup, "GATEWAY_RATE_WINDOW_MS", &mut config.rate_limit.window_ms)?;
    override_num(
        &lookup,
        "GATEWAY_BREAKER_THRESHOLD",
        &mut config.circuit_breaker.failure_threshold,
    )?;
    override_num(
        &lookup,
        "GATEWAY_BREAKER_RESET_MS",
        &mut config.circuit_breaker.reset_timeout_ms,
    )?;
    override_num(&lookup, "GATEWAY_RETRY_MAX_ATTEMPTS", &mut config.retry.max_attempts)?;
    override_num(&lookup, "GATEWAY_RETRY_BASE_DELAY_MS", &mut config.retry.base_delay_ms)?;
    override_num(&lookup, "GATEWAY_RETRY_MAX_DELAY_MS", &mut config.retry.max_delay_ms)?;

    Ok(())
}

fn override_num<F, T>(lookup: &F, var: &'static str, slot: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(var) {
        *slot = raw.trim().parse().map_err(|e: T::Err| ConfigError::Env {
            var,
            reason: e.to_string(),
        })?;
    }
    Ok(())
}
