//! Configuration validation.
//!
//! Pure checks over a [`ServerConfig`]; all problems are reported at once.
//! The port is intentionally not parsed here: it is handed to the socket
//! layer verbatim and a non-numeric value surfaces as a bind failure.

use crate::config::schema::ServerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener host is empty")]
    EmptyHost,

    #[error("listener address `{address}` has an empty port")]
    EmptyPort { address: String },

    #[error("{name} timeout must be greater than zero")]
    ZeroTimeout { name: &'static str },
}

/// Every validation problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid configuration: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
pub struct ConfigError(pub Vec<ValidationError>);

/// Validate `config`, returning all errors rather than the first.
pub fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.listener.host.is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if config.listener.port.is_empty() {
        errors.push(ValidationError::EmptyPort {
            address: config.listener.bind_address(),
        });
    }

    let timeouts = &config.timeouts;
    for (name, value) in [
        ("read", timeouts.read_ms),
        ("write", timeouts.write_ms),
        ("idle", timeouts.idle_ms),
        ("shutdown", timeouts.shutdown_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout { name });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError(errors))
    }
}
