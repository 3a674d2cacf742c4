//! Payment gateway host.
//!
//! ```text
//!   Orchestrator ──HTTP──▶ ┌──────────────────────────────────────────────┐
//!                          │ http (axum)  /health /payment-methods        │
//!                          │              /transactions/{id}              │
//!                          │        │                                     │
//!                          │        ▼                                     │
//!                          │ GatewayClient                                │
//!                          │   RateLimiter → CircuitBreaker → Retry       │
//!                          │        │                                     │
//!                          └────────┼─────────────────────────────────────┘
//!                                   ▼
//!                            Payment processor (HTTPS)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use payment_gateway::config::validation::advisories;
use payment_gateway::config::{load_config, load_from_env};
use payment_gateway::observability::{logging, metrics};
use payment_gateway::{GatewayClient, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "payment-gateway")]
#[command(about = "HTTP host for the resilient payment gateway client", long_about = None)]
struct Args {
    /// TOML config file. GATEWAY_* environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "payment-gateway starting");
    tracing::info!(
        environment = %config.environment,
        base_url = %config.effective_base_url(),
        bind_address = %config.service.bind_address,
        rate_limit = config.rate_limit.limit,
        breaker_threshold = config.circuit_breaker.failure_threshold,
        retry_max_attempts = config.retry.max_attempts,
        "Configuration loaded"
    );
    for note in advisories(&config) {
        tracing::warn!(advisory = %note, "Configuration advisory");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let client = GatewayClient::new(config.clone())?;
    let listener = TcpListener::bind(&config.service.bind_address).await?;

    let shutdown = Shutdown::new();
    let server = HttpServer::new(client, &config.service, shutdown.signal());

    let trigger = shutdown.clone();
    tokio::spawn(async move { trigger.trigger_on_ctrl_c().await });

    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
