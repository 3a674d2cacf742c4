//! HTTP transport to the processor.
//!
//! # Responsibilities
//! - Build request URLs from the configured origin
//! - Inject bearer credentials
//! - Report every outcome as either a response (any status) or a `RawFailure`
//!
//! Status codes are not interpreted here; `ErrorClassifier` owns that.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use url::{Host, Url};

use crate::config::{ConfigError, Credentials, GatewayConfig};
use crate::gateway::classifier::RawFailure;

/// Which credential a request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScope {
    /// Public key; sufficient for read endpoints.
    Public,
    /// Private key; used to prove the full credential pair is valid.
    Private,
}

/// A response as received, before status interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub retry_after: Option<String>,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Convert a non-success response into a failure for classification.
    pub fn into_result(self) -> Result<String, RawFailure> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(RawFailure::Status {
                status: self.status,
                retry_after: self.retry_after,
                body: self.body,
            })
        }
    }
}

/// Sends authenticated GET requests to the processor.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET the path built from `segments`. Segments are percent-encoded.
    async fn get(&self, segments: &[&str], auth: AuthScope) -> Result<TransportResponse, RawFailure>;
}

/// `reqwest`-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url.as_str())
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl HttpTransport {
    pub fn new(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let raw = config.effective_base_url();
        let base_url = Url::parse(&raw)
            .map_err(|e| ConfigError::Client(format!("invalid base URL '{}': {}", raw, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::Client(format!("base URL '{}' cannot carry a path", raw)));
        }

        let timeout = config.request_timeout();
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(3)))
            .user_agent(concat!("payment-gateway/", env!("CARGO_PKG_VERSION")));
        // Local mocks and sidecars must not be routed through a system proxy.
        if is_loopback(&base_url) {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            credentials: config.credentials.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, segments: &[&str]) -> Result<Url, RawFailure> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RawFailure::Other(format!("cannot extend {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn key(&self, auth: AuthScope) -> &str {
        match auth {
            AuthScope::Public => &self.credentials.public_key,
            AuthScope::Private => &self.credentials.private_key,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, segments: &[&str], auth: AuthScope) -> Result<TransportResponse, RawFailure> {
        let url = self.url_for(segments)?;
        tracing::debug!(url = %url, ?auth, "Sending processor request");

        let response = self
            .client
            .get(url)
            .bearer_auth(self.key(auth))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        Ok(TransportResponse {
            status,
            retry_after,
            body,
        })
    }
}

impl From<reqwest::Error> for RawFailure {
    fn from(err: reqwest::Error) -> Self {
        let message = error_chain(&err);
        if err.is_timeout() {
            RawFailure::Timeout(message)
        } else if err.is_connect() {
            if looks_like_dns(&message) {
                RawFailure::Dns(message)
            } else {
                RawFailure::Connect(message)
            }
        } else if err.is_decode() || err.is_body() {
            RawFailure::MalformedBody(message)
        } else {
            RawFailure::Other(message)
        }
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        None => false,
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn looks_like_dns(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("dns") || lower.contains("failed to lookup") || lower.contains("name or service not known")
}
