//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the gateway handlers
//! - Wire up middleware (request ID, timeout, tracing)
//! - Bind server to listener and drain on shutdown

use axum::{routing::get, Router};
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::gateway::GatewayClient;
use crate::http::handlers::{self, AppState};
use crate::resilience::CancelSignal;

/// HTTP host exposing the gateway client to the orchestrator.
pub struct HttpServer {
    router: Router,
    shutdown: CancelSignal,
}

impl HttpServer {
    /// Create a new HTTP server around a shared client.
    pub fn new(client: GatewayClient, config: &ServiceConfig, shutdown: CancelSignal) -> Self {
        let state = AppState {
            client,
            shutdown: shutdown.clone(),
        };
        Self {
            router: build_router(state, config),
            shutdown,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let shutdown = self.shutdown;
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState, config: &ServiceConfig) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/payment-methods", get(handlers::payment_methods))
        .route("/transactions/{id}", get(handlers::transaction_status))
        .with_state(state)
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
