//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the server (validate, bind, begin accepting)
//! - Serve until termination is requested or the accept loop fails
//! - Run the bounded graceful shutdown
//! - Map the outcome to a process exit status
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Termination is any `Future<Output = ()>`, usually
//!   [`TerminationSignal::recv`](crate::lifecycle::TerminationSignal::recv)

use std::future::Future;

use crate::lifecycle::error::LifecycleError;
use crate::lifecycle::server::ServerLifecycle;
use crate::lifecycle::state::LifecycleState;

/// Start `server`, serve until `termination` resolves, then shut down within
/// the configured deadline.
///
/// A server already started (see [`ServerLifecycle::start_on`]) is served
/// as is. An accept-loop failure before termination is returned without
/// draining: the listener is already gone.
pub async fn run<F>(mut server: ServerLifecycle, termination: F) -> Result<(), LifecycleError>
where
    F: Future<Output = ()>,
{
    if server.state() == LifecycleState::Created {
        server.start().await?;
    }

    tokio::select! {
        () = termination => {}
        err = server.accept_failure() => return Err(err),
    }

    let deadline = server.config().timeouts.shutdown();
    server.shutdown(deadline).await
}

/// Log the outcome of [`run`] and return the process exit status.
pub fn exit_status(result: &Result<(), LifecycleError>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e @ LifecycleError::ShutdownTimeout { .. }) => {
            tracing::error!(error = %e, "Server forced to shutdown");
            1
        }
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::config::{ConfigError, ValidationError};
    use crate::net::ListenerError;

    #[test]
    fn clean_shutdown_exits_zero() {
        assert_eq!(exit_status(&Ok(())), 0);
    }

    #[test]
    fn shutdown_timeout_exits_one() {
        let result = Err(LifecycleError::ShutdownTimeout {
            deadline: Duration::from_secs(30),
            active_connections: 2,
        });
        assert_eq!(exit_status(&result), 1);
    }

    #[test]
    fn startup_failures_exit_one() {
        let bind = ListenerError::Bind {
            address: "0.0.0.0:http".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::InvalidInput),
        };
        let config = ConfigError(vec![ValidationError::EmptyHost]);
        let accept = ListenerError::Accept(std::io::Error::from(std::io::ErrorKind::PermissionDenied));

        for result in [
            Err(LifecycleError::from(bind)),
            Err(LifecycleError::from(config)),
            Err(LifecycleError::from(accept)),
            Err(LifecycleError::InvalidState {
                operation: "shutdown",
                state: LifecycleState::Stopped,
            }),
        ] {
            assert_eq!(exit_status(&result), 1);
        }
    }
}
