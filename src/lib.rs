//! Minimal HTTP greeting server with a graceful shutdown lifecycle.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::{LifecycleError, LifecycleState, ServerLifecycle, Shutdown};
