//! Maps raw transport failures onto the gateway error taxonomy.

use serde_json::Value;
use thiserror::Error;

use crate::gateway::error::{GatewayError, NetworkErrorKind};

/// A failure as reported by the transport, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RawFailure {
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("name resolution failed: {0}")]
    Dns(String),

    /// The processor answered with a non-success status.
    #[error("HTTP {status}")]
    Status {
        status: u16,
        retry_after: Option<String>,
        body: String,
    },

    /// A success response whose body could not be parsed.
    #[error("malformed response body: {0}")]
    MalformedBody(String),

    #[error("transport error: {0}")]
    Other(String),
}

/// Classifies transport failures.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    default_retry_after_ms: u64,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(1_000)
    }
}

impl ErrorClassifier {
    pub fn new(default_retry_after_ms: u64) -> Self {
        Self {
            default_retry_after_ms,
        }
    }

    pub fn classify(&self, failure: RawFailure) -> GatewayError {
        match failure {
            RawFailure::Timeout(msg) => GatewayError::network(NetworkErrorKind::Timeout, msg),
            RawFailure::Connect(msg) => GatewayError::network(NetworkErrorKind::Connect, msg),
            RawFailure::Dns(msg) => GatewayError::network(NetworkErrorKind::Dns, msg),
            RawFailure::Other(msg) => GatewayError::network(NetworkErrorKind::Other, msg),
            // Debatable: a malformed body on a success status may be a permanent
            // contract mismatch rather than a proxy glitch. Kept retryable; the
            // client logs every occurrence at warn so it can be reviewed.
            RawFailure::MalformedBody(msg) => {
                GatewayError::network(NetworkErrorKind::MalformedBody, msg)
            }
            RawFailure::Status {
                status,
                retry_after,
                body,
            } => self.classify_status(status, retry_after.as_deref(), &body),
        }
    }

    fn classify_status(&self, status: u16, retry_after: Option<&str>, body: &str) -> GatewayError {
        match status {
            401 | 403 => GatewayError::Authentication { status },
            429 => GatewayError::RateLimit {
                retry_after_ms: retry_after
                    .and_then(parse_retry_after)
                    .unwrap_or(self.default_retry_after_ms),
            },
            500..=599 => GatewayError::Server { status },
            400 | 422 => match field_error(body) {
                Some((field, reason)) => GatewayError::Validation { field, reason },
                None => GatewayError::validation(
                    "request",
                    error_reason(body).unwrap_or_else(|| format!("rejected with HTTP {}", status)),
                ),
            },
            _ => GatewayError::validation(
                "request",
                error_reason(body).unwrap_or_else(|| format!("unexpected HTTP {}", status)),
            ),
        }
    }
}

/// Parse a delta-seconds `Retry-After` value into milliseconds.
fn parse_retry_after(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok().map(|secs| secs.saturating_mul(1_000))
}

/// Extract the first field-level message from a processor error body:
/// `{"error":{"messages":{"field":["reason", ...]}}}`.
fn field_error(body: &str) -> Option<(String, String)> {
    let value: Value = serde_json::from_str(body).ok()?;
    let messages = value.get("error")?.get("messages")?.as_object()?;
    let (field, reasons) = messages.iter().next()?;

    let reason = match reasons {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("; "),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Some((field.clone(), reason))
}

/// Extract `error.reason` from a processor error body.
fn error_reason(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("reason")?
        .as_str()
        .map(str::to_string)
}
