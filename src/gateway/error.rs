//! Gateway error taxonomy.
//!
//! ```text
//! caller-fixable           Validation                      never retried
//! transient-infrastructure Network, Server(5xx), RateLimit retried, then surfaced
//! non-retryable-operational Authentication, CircuitOpen    surfaced immediately
//! ```

use thiserror::Error;

/// What went wrong below the HTTP status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    Timeout,
    Connect,
    Dns,
    /// Response body could not be parsed.
    MalformedBody,
    /// The caller cancelled the operation.
    Cancelled,
    /// The outer retry deadline elapsed.
    DeadlineExceeded,
    Other,
}

impl NetworkErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkErrorKind::Timeout => "timeout",
            NetworkErrorKind::Connect => "connect",
            NetworkErrorKind::Dns => "dns",
            NetworkErrorKind::MalformedBody => "malformed_body",
            NetworkErrorKind::Cancelled => "cancelled",
            NetworkErrorKind::DeadlineExceeded => "deadline_exceeded",
            NetworkErrorKind::Other => "other",
        }
    }
}

impl std::fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the gateway client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Transport-level failure.
    #[error("network error ({kind}): {message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },

    /// Credentials rejected by the processor.
    #[error("authentication rejected by processor (HTTP {status})")]
    Authentication { status: u16 },

    /// Input rejected locally or by the processor.
    #[error("validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Request rate exceeded, locally or at the processor.
    #[error("rate limited, retry after {retry_after_ms} ms")]
    RateLimit { retry_after_ms: u64 },

    /// Processor returned a 5xx.
    #[error("processor server error (HTTP {status})")]
    Server { status: u16 },

    /// Circuit breaker is open for this endpoint group.
    #[error("circuit open for {group}")]
    CircuitOpen { group: &'static str },
}

impl GatewayError {
    pub fn network(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        GatewayError::Network {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        GatewayError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::network(NetworkErrorKind::Cancelled, "operation cancelled by caller")
    }

    /// Whether a local retry may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Network { kind, .. } => !matches!(
                kind,
                NetworkErrorKind::Cancelled | NetworkErrorKind::DeadlineExceeded
            ),
            GatewayError::Server { status } => (500..600).contains(status),
            GatewayError::RateLimit { .. } => true,
            GatewayError::Authentication { .. }
            | GatewayError::Validation { .. }
            | GatewayError::CircuitOpen { .. } => false,
        }
    }

    /// Whether this outcome means the processor itself is unhealthy.
    ///
    /// Validation errors prove the processor answered, so they do not count
    /// against the circuit breaker. Cancellation says nothing about it either.
    pub fn counts_as_breaker_failure(&self) -> bool {
        match self {
            GatewayError::Validation { .. } | GatewayError::CircuitOpen { .. } => false,
            GatewayError::Network { kind, .. } => *kind != NetworkErrorKind::Cancelled,
            _ => true,
        }
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Network { .. } => "network",
            GatewayError::Authentication { .. } => "authentication",
            GatewayError::Validation { .. } => "validation",
            GatewayError::RateLimit { .. } => "rate_limit",
            GatewayError::Server { .. } => "server",
            GatewayError::CircuitOpen { .. } => "circuit_open",
        }
    }

    /// Processor-neutral message suitable for end users.
    pub fn user_facing_message(&self) -> String {
        match self {
            GatewayError::CircuitOpen { .. } | GatewayError::Authentication { .. } => {
                "payment service temporarily unavailable".to_string()
            }
            GatewayError::Validation { field, reason } => format!("invalid {}: {}", field, reason),
            GatewayError::RateLimit { .. } => "too many payment requests, try again shortly".to_string(),
            GatewayError::Network { .. } | GatewayError::Server { .. } => {
                "payment status unknown, try again later".to_string()
            }
        }
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability() {
        assert!(GatewayError::network(NetworkErrorKind::Timeout, "t").is_retryable());
        assert!(GatewayError::network(NetworkErrorKind::MalformedBody, "m").is_retryable());
        assert!(GatewayError::Server { status: 503 }.is_retryable());
        assert!(GatewayError::RateLimit { retry_after_ms: 10 }.is_retryable());

        assert!(!GatewayError::Authentication { status: 401 }.is_retryable());
        assert!(!GatewayError::validation("id", "empty").is_retryable());
        assert!(!GatewayError::CircuitOpen { group: "transactions" }.is_retryable());
        assert!(!GatewayError::cancelled().is_retryable());
    }

    #[test]
    fn test_breaker_accounting() {
        assert!(GatewayError::Authentication { status: 403 }.counts_as_breaker_failure());
        assert!(GatewayError::Server { status: 500 }.counts_as_breaker_failure());
        assert!(!GatewayError::validation("id", "bad").counts_as_breaker_failure());
        assert!(!GatewayError::cancelled().counts_as_breaker_failure());
    }

    #[test]
    fn test_user_facing_hides_internals() {
        let msg = GatewayError::Authentication { status: 401 }.user_facing_message();
        assert_eq!(msg, "payment service temporarily unavailable");
        assert!(!msg.contains("401"));
        assert_eq!(
            GatewayError::CircuitOpen { group: "transactions" }.user_facing_message(),
            msg
        );
    }

    #[test]
    fn test_error_display() {
        let err = GatewayError::RateLimit { retry_after_ms: 1500 };
        assert_eq!(err.to_string(), "rate limited, retry after 1500 ms");

        let err = GatewayError::validation("transaction_id", "must not be empty");
        assert_eq!(err.to_string(), "validation failed for transaction_id: must not be empty");
    }
}
