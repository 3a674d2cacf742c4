//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Ctrl+C
//!     → shutdown.rs (fire the shared cancel signal)
//!     → HTTP server stops accepting and drains
//!     → in-flight gateway calls observe the signal and return Cancelled
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
