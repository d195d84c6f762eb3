//! TCP listener implementation.
//!
//! # Responsibilities
//! - Bind to the configured `host:port`
//! - Accept incoming TCP connections
//! - Classify accept errors as transient (retry) or fatal

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use rand::Rng;
use tokio::net::{TcpListener, TcpStream};

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },
    /// Failed to accept connection.
    #[error("failed to accept: {0}")]
    Accept(#[source] io::Error),
}

impl ListenerError {
    /// Whether the error concerns a single handshake rather than the socket.
    pub fn is_transient(&self) -> bool {
        match self {
            ListenerError::Bind { .. } => false,
            ListenerError::Accept(e) => matches!(
                e.kind(),
                io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::Interrupted
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::TimedOut
            ),
        }
    }
}

/// Source of accepted TCP connections driven by the accept loop.
pub trait Accept: Send + Sync + 'static {
    /// Wait for the next connection.
    fn accept(
        &self,
    ) -> impl Future<Output = Result<(TcpStream, SocketAddr), ListenerError>> + Send;

    /// Address connections arrive on.
    fn local_addr(&self) -> SocketAddr;
}

/// A bound TCP listener.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind to `address` (`host:port`, host names are resolved).
    pub async fn bind(address: &str) -> Result<Self, ListenerError> {
        let bind_error = |source| ListenerError::Bind {
            address: address.to_string(),
            source,
        };

        let inner = TcpListener::bind(address).await.map_err(bind_error)?;
        let local_addr = inner.local_addr().map_err(bind_error)?;

        tracing::debug!(address = %local_addr, "Listener bound");

        Ok(Self { inner, local_addr })
    }

    /// Accept a new connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ListenerError> {
        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;
        tracing::trace!(peer_addr = %addr, "Connection accepted");
        Ok((stream, addr))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Accept for Listener {
    fn accept(
        &self,
    ) -> impl Future<Output = Result<(TcpStream, SocketAddr), ListenerError>> + Send {
        Listener::accept(self)
    }

    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// Delay before retrying after the `attempt`-th consecutive transient
/// accept error: exponential from `base_ms`, capped at `max_ms`, plus up to
/// 10% jitter.
pub fn accept_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let capped_delay = base_ms.saturating_mul(exponential_base).min(max_ms);

    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_reports_local_addr() {
        let listener = Listener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn bind_to_occupied_port_fails() {
        let first = Listener::bind("127.0.0.1:0").await.unwrap();
        let address = first.local_addr().to_string();

        let err = Listener::bind(&address).await.unwrap_err();
        assert!(matches!(err, ListenerError::Bind { .. }));
        assert!(!err.is_transient());
        assert!(err.to_string().contains(&address));
    }

    #[tokio::test]
    async fn bind_with_non_numeric_port_fails() {
        let err = Listener::bind("127.0.0.1:not-a-port").await.unwrap_err();
        assert!(matches!(err, ListenerError::Bind { .. }));
    }

    #[tokio::test]
    async fn accept_returns_peer_address() {
        let listener = Listener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr()).await.unwrap();

        let (_stream, peer) = listener.accept().await.unwrap();
        assert_eq!(peer, client.local_addr().unwrap());
    }

    #[test]
    fn transient_accept_errors() {
        let aborted = ListenerError::Accept(io::Error::from(io::ErrorKind::ConnectionAborted));
        assert!(aborted.is_transient());

        let other = ListenerError::Accept(io::Error::other("socket closed"));
        assert!(!other.is_transient());
    }

    #[test]
    fn backoff_grows_and_caps() {
        assert_eq!(accept_backoff(0, 5, 1000), Duration::ZERO);
        assert!(accept_backoff(1, 5, 1000) >= Duration::from_millis(5));
        assert!(accept_backoff(3, 5, 1000) >= Duration::from_millis(20));

        let capped = accept_backoff(20, 5, 1000);
        assert!(capped >= Duration::from_millis(1000));
        assert!(capped < Duration::from_millis(1100));
    }
}
