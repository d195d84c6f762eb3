//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT and SIGTERM handlers up front, so registration errors
//!   surface before the server starts
//! - Resolve a future on the first termination signal
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - The lifecycle only sees a `Future<Output = ()>`, so tests can pass any
//!   synthetic termination trigger instead

use std::io;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Registered termination signal handlers.
#[derive(Debug)]
pub struct TerminationSignal {
    #[cfg(unix)]
    interrupt: Signal,
    #[cfg(unix)]
    terminate: Signal,
}

impl TerminationSignal {
    /// Register the handlers.
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Register the handlers.
    #[cfg(not(unix))]
    pub fn install() -> io::Result<Self> {
        Ok(Self {})
    }

    /// Wait for SIGINT or SIGTERM.
    #[cfg(unix)]
    pub async fn recv(mut self) {
        let name = tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        };
        tracing::info!(signal = name, "Termination signal received");
    }

    /// Wait for Ctrl+C.
    #[cfg(not(unix))]
    pub async fn recv(self) {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!(signal = "ctrl-c", "Termination signal received"),
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    }
}
