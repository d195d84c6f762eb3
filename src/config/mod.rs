//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! process environment (PORT)
//!     → loader.rs (resolve port, apply defaults)
//!     → ServerConfig (immutable)
//!     → validation.rs (semantic checks, run by the lifecycle before bind)
//! ```
//!
//! # Design Decisions
//! - Only the listen port is configurable; timeouts carry fixed defaults
//! - The port is passed through verbatim, never parsed or normalised
//! - Validation separates structural (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_from_env, load_with};
pub use schema::{ListenerConfig, ObservabilityConfig, ServerConfig, TimeoutConfig};
pub use validation::{validate_config, ConfigError, ValidationError};
