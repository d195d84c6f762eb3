//! Configuration loading from the process environment.

use crate::config::schema::ServerConfig;

/// Environment variable holding the listen port.
pub const PORT_VAR: &str = "PORT";

/// Port used when `PORT` is unset or empty.
pub const DEFAULT_PORT: &str = "8080";

/// Load configuration from the process environment.
pub fn load_from_env() -> ServerConfig {
    load_with(|key| std::env::var(key).ok())
}

/// Load configuration using `lookup` to resolve environment variables.
///
/// The port is taken verbatim; an unset or empty `PORT` falls back to
/// [`DEFAULT_PORT`]. Everything else keeps its default.
pub fn load_with<F>(lookup: F) -> ServerConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ServerConfig::default();
    config.listener.port = lookup(PORT_VAR)
        .filter(|port| !port.is_empty())
        .unwrap_or_else(|| DEFAULT_PORT.to_string());
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(port: Option<&'static str>) -> impl Fn(&str) -> Option<String> {
        move |key| match key {
            PORT_VAR => port.map(str::to_string),
            _ => None,
        }
    }

    #[test]
    fn unset_port_defaults_to_8080() {
        let config = load_with(env(None));
        assert_eq!(config.listener.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn empty_port_defaults_to_8080() {
        let config = load_with(env(Some("")));
        assert_eq!(config.listener.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn custom_port_is_used() {
        let config = load_with(env(Some("9090")));
        assert_eq!(config.listener.bind_address(), "0.0.0.0:9090");
    }

    #[test]
    fn port_is_not_normalised() {
        let config = load_with(env(Some("08080")));
        assert_eq!(config.listener.bind_address(), "0.0.0.0:08080");
    }

    #[test]
    fn timeouts_are_not_read_from_env() {
        let config = load_with(|_| Some("1".to_string()));
        assert_eq!(config.listener.port, "1");
        assert_eq!(config.timeouts, Default::default());
    }
}
