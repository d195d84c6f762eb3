//! Configuration schema definitions.
//!
//! The defaults carry the production values; only the listen port is read
//! from the environment (see `loader.rs`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the greeting server.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (host and port).
    pub listener: ListenerConfig,

    /// Connection and shutdown timeouts.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind.
    pub host: String,

    /// Port segment of the bind address, kept verbatim as given.
    pub port: String,
}

impl ListenerConfig {
    /// The `host:port` string handed to the socket layer.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: "8080".to_string(),
        }
    }
}

/// Timeout configuration for connections and shutdown.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Maximum time to receive a complete request head, in milliseconds.
    pub read_ms: u64,

    /// Maximum time to produce a response, in milliseconds.
    pub write_ms: u64,

    /// Maximum keep-alive idle time between requests, in milliseconds.
    pub idle_ms: u64,

    /// Graceful shutdown deadline, in milliseconds.
    pub shutdown_ms: u64,
}

impl TimeoutConfig {
    pub fn read(&self) -> Duration {
        Duration::from_millis(self.read_ms)
    }

    pub fn write(&self) -> Duration {
        Duration::from_millis(self.write_ms)
    }

    pub fn idle(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }

    pub fn shutdown(&self) -> Duration {
        Duration::from_millis(self.shutdown_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_ms: 15_000,
            write_ms: 15_000,
            idle_ms: 60_000,
            shutdown_ms: 30_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
