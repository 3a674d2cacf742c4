//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check credentials are present and match the configured environment
//! - Validate value ranges (limits > 0, delays ordered)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Advisories are reported separately and never block startup

use crate::config::schema::GatewayConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let tag = config.environment.key_tag();

    let public_key = config.credentials.public_key.trim();
    if public_key.is_empty() {
        errors.push(ValidationError::new("credentials.public_key", "missing"));
    } else if !public_key.starts_with(&format!("pub_{}_", tag)) {
        errors.push(ValidationError::new(
            "credentials.public_key",
            format!("expected pub_{}_ prefix for {} environment", tag, config.environment),
        ));
    }

    let private_key = config.credentials.private_key.trim();
    if private_key.is_empty() {
        errors.push(ValidationError::new("credentials.private_key", "missing"));
    } else if !private_key.starts_with(&format!("prv_{}_", tag)) {
        errors.push(ValidationError::new(
            "credentials.private_key",
            format!("expected prv_{}_ prefix for {} environment", tag, config.environment),
        ));
    }

    match url::Url::parse(&config.effective_base_url()) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            "base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("base_url", e.to_string())),
    }

    if config.request_timeout_ms == 0 {
        errors.push(ValidationError::new("request_timeout_ms", "must be greater than zero"));
    }
    if config.rate_limit.limit == 0 {
        errors.push(ValidationError::new("rate_limit.limit", "must be greater than zero"));
    }
    if config.rate_limit.window_ms == 0 {
        errors.push(ValidationError::new("rate_limit.window_ms", "must be greater than zero"));
    }
    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError::new(
            "circuit_breaker.failure_threshold",
            "must be greater than zero",
        ));
    }
    if config.retry.max_attempts == 0 {
        errors.push(ValidationError::new("retry.max_attempts", "must be at least 1"));
    }
    if config.retry.base_delay_ms > config.retry.max_delay_ms {
        errors.push(ValidationError::new(
            "retry.base_delay_ms",
            "must not exceed retry.max_delay_ms",
        ));
    }
    if config.health.check_timeout_ms == 0 {
        errors.push(ValidationError::new("health.check_timeout_ms", "must be greater than zero"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Non-fatal findings worth surfacing as a degraded configuration.
pub fn advisories(config: &GatewayConfig) -> Vec<String> {
    let mut notes = Vec::new();

    if config.effective_base_url().starts_with("http://") {
        notes.push("base_url uses plain http; credentials travel unencrypted".to_string());
    }
    if config.health.check_timeout_ms > config.request_timeout_ms {
        notes.push("health.check_timeout_ms exceeds request_timeout_ms".to_string());
    }

    notes
}
