//! Structured logging.
//!
//! # Responsibilities
//! - Build the JSON log pipeline (one object per line)
//! - Resolve the log level from `RUST_LOG` or configuration
//!
//! # Design Decisions
//! - No process-wide default subscriber is installed. The returned
//!   [`Dispatch`] is attached explicitly to the futures that should log
//!   through it (`WithSubscriber::with_subscriber`)
//! - Event fields are flattened into the top-level JSON object

use tracing::Dispatch;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use crate::config::ObservabilityConfig;

/// Build the production dispatcher: JSON records on stdout.
pub fn build_dispatch(config: &ObservabilityConfig) -> Dispatch {
    dispatch_with_writer(env_filter(config), std::io::stdout)
}

/// Level filter taken from `RUST_LOG`, falling back to the configured level.
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
}

/// Build a JSON dispatcher writing to `writer`.
pub fn dispatch_with_writer<W>(filter: EnvFilter, writer: W) -> Dispatch
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let subscriber = tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_writer(writer),
    );
    Dispatch::new(subscriber)
}
