//! Payment processor client.
//!
//! # Data Flow
//! ```text
//! Orchestrator
//!     → client.rs (input checks, call_id span, fallback policy)
//!     → resilience pipeline (limiter, breaker, retry, timeouts)
//!     → transport.rs (HTTP GET with bearer credentials)
//!     → classifier.rs (raw failure → GatewayError)
//!     → wire.rs (processor JSON → types.rs)
//! ```

pub mod classifier;
pub mod client;
pub mod error;
pub mod transport;
pub mod types;
pub mod wire;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::{ErrorClassifier, RawFailure};
pub use client::GatewayClient;
pub use error::{GatewayError, GatewayResult, NetworkErrorKind};
pub use transport::{AuthScope, HttpTransport, Transport, TransportResponse};
pub use types::{
    PaymentMethodDescriptor, PaymentMethodSummary, PaymentMethodType, PaymentMethods,
    TransactionState, TransactionStatus,
};
