//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! lifecycle, net, http
//!     → tracing macros (structured fields)
//!     → logging.rs (explicit Dispatch: EnvFilter + JSON formatter)
//!     → stdout
//! ```

pub mod logging;
