//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs, server.rs):
//!     Validate config → Bind listener → Spawn accept loop
//!
//! Shutdown (server.rs, shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Exit
//!     Deadline exceeded → Force-close remaining connections → Error
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has a deadline: forced close after it elapses
//! - State transitions are observable through a watch channel

pub mod error;
pub mod server;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use error::LifecycleError;
pub use server::ServerLifecycle;
pub use shutdown::{Shutdown, ShutdownListener};
pub use signals::TerminationSignal;
pub use startup::{exit_status, run};
pub use state::LifecycleState;
