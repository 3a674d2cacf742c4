//! Shutdown coordination for the gateway host.

use crate::resilience::{CancelHandle, CancelSignal};

/// Coordinator for graceful shutdown.
///
/// Built on the same cancel primitive callers use for individual gateway
/// calls, so in-flight processor requests stop when the process shuts down.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    handle: CancelHandle,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self {
            handle: CancelHandle::new(),
        }
    }

    /// Signal observed by the server and by in-flight gateway calls.
    pub fn signal(&self) -> CancelSignal {
        self.handle.signal()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        if !self.handle.is_cancelled() {
            tracing::info!("Shutdown triggered");
        }
        self.handle.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.handle.is_cancelled()
    }

    /// Wait for Ctrl+C, then trigger shutdown. If the handler cannot be
    /// installed the process keeps running and this never returns.
    pub async fn trigger_on_ctrl_c(&self) {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                self.trigger();
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_reaches_every_signal() {
        let shutdown = Shutdown::new();
        let early = shutdown.signal();

        let waiter = tokio::spawn(async move { early.cancelled().await });
        shutdown.trigger();
        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter woke")
            .unwrap();
        assert!(shutdown.is_triggered());
        assert!(shutdown.signal().is_cancelled());
    }
}
