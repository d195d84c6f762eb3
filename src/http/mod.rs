//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper HTTP/1.1 connection, timeouts, drain)
//!     → middleware (write timeout, request tracing)
//!     → handler.rs (greeting from the request path)
//!     → response.rs (200, text/plain; charset=utf-8)
//!     → Send to client
//! ```

pub mod handler;
pub mod response;
pub mod server;

pub use handler::{greeting, router};
pub use server::HttpServer;
