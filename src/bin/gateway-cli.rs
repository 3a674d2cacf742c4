use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use payment_gateway::config::{load_config, load_from_env, ConfigError, GatewayConfig};
use payment_gateway::{GatewayClient, HealthStatus};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Query the payment processor through the resilient gateway client", long_about = None)]
struct Cli {
    /// TOML config file. GATEWAY_* environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a transaction's current status
    Status {
        /// Processor transaction id
        transaction_id: String,
    },
    /// List the payment methods checkout can offer
    Methods,
    /// Run the composite health check
    Health,
}

fn load(path: Option<&PathBuf>) -> Result<GatewayConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => load_from_env(),
    }
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: failed to render response: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let client = match load(cli.config.as_ref()).and_then(GatewayClient::new) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    match cli.command {
        Commands::Status { transaction_id } => match client.get_transaction_status(&transaction_id).await {
            Ok(status) => print_json(&status),
            Err(e) => {
                eprintln!("Error ({}): {}", e.kind(), e);
                ExitCode::FAILURE
            }
        },
        Commands::Methods => match client.get_payment_methods().await {
            Ok(methods) => {
                if methods.is_default {
                    eprintln!("Warning: processor unavailable, showing default payment methods");
                }
                print_json(&methods)
            }
            Err(e) => {
                eprintln!("Error ({}): {}", e.kind(), e);
                ExitCode::FAILURE
            }
        },
        Commands::Health => {
            let report = client.health_check().await;
            let code = print_json(&report);
            if report.status == HealthStatus::Unhealthy {
                ExitCode::FAILURE
            } else {
                code
            }
        }
    }
}
