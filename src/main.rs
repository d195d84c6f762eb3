//! Hello server
//!
//! Answers every HTTP request with a plain-text greeting built from the
//! request path, and shuts down gracefully on SIGINT or SIGTERM.
//!
//! # Lifecycle
//!
//! ```text
//!   PORT ──▶ config ──▶ bind 0.0.0.0:PORT ──▶ serve ──┐
//!                                                     │ SIGINT / SIGTERM
//!                                                     ▼
//!           exit 0 ◀── "Server exited" ◀── drain connections (30s deadline)
//!                                                     │ deadline exceeded
//!                                                     ▼
//!                                                   exit 1
//! ```

use std::process::ExitCode;

use tracing::instrument::WithSubscriber;

use hello_server::config::load_from_env;
use hello_server::lifecycle::{self, ServerLifecycle, TerminationSignal};
use hello_server::observability::logging::build_dispatch;

#[tokio::main]
async fn main() -> ExitCode {
    let config = load_from_env();
    let dispatch = build_dispatch(&config.observability);

    let server = ServerLifecycle::new(config, dispatch.clone());
    serve(server).with_subscriber(dispatch).await
}

async fn serve(server: ServerLifecycle) -> ExitCode {
    // Register handlers before binding so no signal is missed.
    let termination = match TerminationSignal::install() {
        Ok(termination) => termination,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            return ExitCode::FAILURE;
        }
    };

    let result = lifecycle::run(server, termination.recv()).await;
    ExitCode::from(lifecycle::exit_status(&result))
}
