//! Lifecycle errors.
//!
//! Every variant is fatal for the process: `main` logs it and exits with a
//! non-zero status.

use std::time::Duration;

use crate::config::ConfigError;
use crate::lifecycle::state::LifecycleState;
use crate::net::ListenerError;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The configuration failed validation before binding.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Bind failure, or an accept failure outside of shutdown.
    #[error(transparent)]
    Listener(#[from] ListenerError),

    /// In-flight connections did not finish before the deadline.
    #[error("shutdown deadline of {deadline:?} exceeded with {active_connections} connection(s) still open")]
    ShutdownTimeout {
        deadline: Duration,
        active_connections: usize,
    },

    /// The operation is not allowed in the current state.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },

    /// The accept loop task panicked or was cancelled.
    #[error("accept loop task failed: {0}")]
    AcceptTask(#[from] tokio::task::JoinError),
}
