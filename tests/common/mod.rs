//! Shared utilities for integration testing against a mock processor.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use payment_gateway::config::GatewayConfig;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// Scripted reply from the mock processor.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
    pub delay: Option<Duration>,
}

#[allow(dead_code)]
impl MockResponse {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
            delay: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self::json(status, "")
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// A request as seen by the mock.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct SeenRequest {
    pub path: String,
    pub authorization: Option<String>,
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Start a programmable mock processor on an ephemeral port.
///
/// `f` receives each request and decides the reply.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(SeenRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockResponse> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let (read_half, mut write_half) = socket.into_split();
                        let mut reader = BufReader::new(read_half);

                        let mut request_line = String::new();
                        if reader.read_line(&mut request_line).await.is_err() {
                            return;
                        }
                        let path = request_line
                            .split_whitespace()
                            .nth(1)
                            .unwrap_or("/")
                            .to_string();

                        let mut authorization = None;
                        loop {
                            let mut line = String::new();
                            match reader.read_line(&mut line).await {
                                Ok(0) | Err(_) => break,
                                Ok(_) if line == "\r\n" => break,
                                Ok(_) => {
                                    if let Some((name, value)) = line.split_once(':') {
                                        if name.eq_ignore_ascii_case("authorization") {
                                            authorization = Some(value.trim().to_string());
                                        }
                                    }
                                }
                            }
                        }

                        let reply = f(SeenRequest { path, authorization }).await;
                        if let Some(delay) = reply.delay {
                            tokio::time::sleep(delay).await;
                        }

                        let mut head = format!(
                            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
                            reply.status,
                            reason(reply.status),
                            reply.body.len()
                        );
                        for (name, value) in &reply.headers {
                            head.push_str(&format!("{}: {}\r\n", name, value));
                        }
                        head.push_str("\r\n");

                        let _ = write_half.write_all(head.as_bytes()).await;
                        let _ = write_half.write_all(reply.body.as_bytes()).await;
                        let _ = write_half.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Client configuration pointed at a mock, with fast retries.
#[allow(dead_code)]
pub fn mock_config(addr: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.base_url = Some(format!("http://{}", addr));
    config.credentials.public_key = "pub_test_integration".into();
    config.credentials.private_key = "prv_test_integration".into();
    config.request_timeout_ms = 1_000;
    config.retry.base_delay_ms = 10;
    config.retry.max_delay_ms = 50;
    config.health.check_timeout_ms = 1_000;
    config
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

#[allow(dead_code)]
pub fn transaction_body(id: &str, status: &str) -> String {
    format!(
        r#"{{"data":{{"id":"{}","status":"{}","amount_in_cents":50000,"currency":"COP",
            "reference":"order-1001","created_at":"2024-03-01T15:04:05.000Z",
            "finalized_at":"2024-03-01T15:04:08.000Z","customer_email":"buyer@example.com",
            "payment_method_type":"CARD",
            "payment_method":{{"type":"CARD","extra":{{"brand":"MASTERCARD"}},"installments":3}}}}}}"#,
        id, status
    )
}
