//! HTTP host for the gateway client.
//!
//! # Data Flow
//! ```text
//! Orchestrator request
//!     → server.rs (request ID, timeout, trace layers)
//!     → handlers.rs (call GatewayClient, map GatewayError to status)
//!     → JSON response
//! ```

pub mod handlers;
pub mod server;

pub use handlers::{ApiError, AppState};
pub use server::{build_router, HttpServer};
