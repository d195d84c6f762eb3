//! Server lifecycle: start, accept-failure watch, bounded graceful shutdown.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::instrument::WithSubscriber;
use tracing::Dispatch;

use crate::config::{validate_config, ServerConfig};
use crate::http::{handler, HttpServer};
use crate::lifecycle::error::LifecycleError;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::state::{LifecycleState, StateCell};
use crate::net::{Accept, ConnectionTracker, Listener, ListenerError};

/// Owns the listening socket, its connections and the shutdown sequence.
///
/// All logging, including from the tasks it spawns, goes through the
/// [`Dispatch`] given at construction.
pub struct ServerLifecycle {
    config: ServerConfig,
    dispatch: Dispatch,
    server: HttpServer,
    state: StateCell,
    tracker: ConnectionTracker,
    /// Stops the accept loop and asks connections to finish.
    drain: Shutdown,
    /// Drops connections still open after the deadline.
    force: Shutdown,
    local_addr: Option<SocketAddr>,
    accept_task: Option<JoinHandle<Result<(), ListenerError>>>,
}

impl ServerLifecycle {
    /// Create a server answering every request with the greeting handler.
    pub fn new(config: ServerConfig, dispatch: Dispatch) -> Self {
        Self::with_router(config, dispatch, handler::router())
    }

    /// Create a server dispatching to `router`.
    pub fn with_router(config: ServerConfig, dispatch: Dispatch, router: Router) -> Self {
        let server = HttpServer::new(router, config.timeouts.clone());
        Self {
            config,
            dispatch,
            server,
            state: StateCell::new(),
            tracker: ConnectionTracker::new(),
            drain: Shutdown::new(),
            force: Shutdown::new(),
            local_addr: None,
            accept_task: None,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// Observe state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Address the listener is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Number of connections currently open.
    pub fn active_connections(&self) -> usize {
        self.tracker.active_count()
    }

    /// Validate the configuration, bind the listener and start accepting
    /// on a background task. Returns once the socket is bound.
    pub async fn start(&mut self) -> Result<SocketAddr, LifecycleError> {
        let dispatch = self.dispatch.clone();
        self.bind_and_serve().with_subscriber(dispatch).await
    }

    /// Validate the configuration and start accepting from `acceptor`
    /// instead of binding the configured address.
    pub fn start_on<A: Accept>(&mut self, acceptor: A) -> Result<SocketAddr, LifecycleError> {
        let dispatch = self.dispatch.clone();
        tracing::dispatcher::with_default(&dispatch, || {
            self.ensure_created()?;
            if let Err(e) = validate_config(&self.config) {
                self.state.transition("start", LifecycleState::Failed)?;
                return Err(e.into());
            }
            self.serve(acceptor)
        })
    }

    async fn bind_and_serve(&mut self) -> Result<SocketAddr, LifecycleError> {
        self.ensure_created()?;
        let listener = match self.bind().await {
            Ok(listener) => listener,
            Err(e) => {
                self.state.transition("start", LifecycleState::Failed)?;
                return Err(e);
            }
        };
        self.serve(listener)
    }

    fn ensure_created(&self) -> Result<(), LifecycleError> {
        match self.state.get() {
            LifecycleState::Created => Ok(()),
            state => Err(LifecycleError::InvalidState {
                operation: "start",
                state,
            }),
        }
    }

    async fn bind(&self) -> Result<Listener, LifecycleError> {
        validate_config(&self.config)?;
        let listener = Listener::bind(&self.config.listener.bind_address()).await?;
        Ok(listener)
    }

    /// Move to `Listening` and spawn the accept loop over `acceptor`.
    fn serve<A: Accept>(&mut self, acceptor: A) -> Result<SocketAddr, LifecycleError> {
        let local_addr = acceptor.local_addr();
        self.state.transition("start", LifecycleState::Listening)?;

        tracing::info!(
            port = %self.config.listener.port,
            address = %local_addr,
            "Starting server"
        );

        let server = self.server.clone();
        let tracker = self.tracker.clone();
        let drain = self.drain.subscribe();
        let force = self.force.subscribe();
        let state = self.state.clone();
        let accept_loop = async move {
            let result = server.run(acceptor, tracker, drain, force).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "Accept loop failed");
                let _ = state.transition("accept", LifecycleState::Failed);
            }
            result
        };

        self.accept_task = Some(tokio::spawn(
            accept_loop.with_subscriber(self.dispatch.clone()),
        ));
        self.local_addr = Some(local_addr);
        Ok(local_addr)
    }

    /// Resolve with the error that ended the accept loop.
    ///
    /// Never resolves while the server is healthy, nor after a deliberate
    /// shutdown stopped the loop. Cancel safe.
    pub async fn accept_failure(&mut self) -> LifecycleError {
        if let Some(task) = self.accept_task.as_mut() {
            let outcome = task.await;
            self.accept_task = None;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return e.into(),
                Err(e) => {
                    let _ = self.state.transition("accept", LifecycleState::Failed);
                    return e.into();
                }
            }
        }
        std::future::pending().await
    }

    /// Stop accepting, let in-flight requests finish, and wait for every
    /// connection to close, bounded by `deadline`.
    ///
    /// Connections still open when the deadline elapses are force-closed and
    /// [`LifecycleError::ShutdownTimeout`] is returned. A second call is
    /// rejected with [`LifecycleError::InvalidState`].
    pub async fn shutdown(&mut self, deadline: Duration) -> Result<(), LifecycleError> {
        let dispatch = self.dispatch.clone();
        self.drain_connections(deadline).with_subscriber(dispatch).await
    }

    async fn drain_connections(&mut self, deadline: Duration) -> Result<(), LifecycleError> {
        if self.state.get() == LifecycleState::Created {
            return self.state.transition("shutdown", LifecycleState::Stopped);
        }
        self.state.transition("shutdown", LifecycleState::ShuttingDown)?;

        tracing::info!(
            active_connections = self.tracker.active_count(),
            deadline = ?deadline,
            "Shutting down server..."
        );
        self.drain.trigger();

        let accept_task = self.accept_task.take();
        let tracker = self.tracker.clone();
        let drained = tokio::time::timeout(deadline, async move {
            if let Some(task) = accept_task {
                match task.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::warn!(error = %e, "Accept loop failed during shutdown"),
                    Err(e) => tracing::warn!(error = %e, "Accept loop task failed during shutdown"),
                }
            }
            tracker.wait_idle().await;
        })
        .await;

        match drained {
            Ok(()) => {
                self.state.transition("shutdown", LifecycleState::Stopped)?;
                tracing::info!("Server exited");
                Ok(())
            }
            Err(_) => {
                let active_connections = self.tracker.active_count();
                self.force.trigger();
                self.state.transition("shutdown", LifecycleState::Failed)?;
                Err(LifecycleError::ShutdownTimeout {
                    deadline,
                    active_connections,
                })
            }
        }
    }
}

impl std::fmt::Debug for ServerLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerLifecycle")
            .field("config", &self.config)
            .field("state", &self.state.get())
            .field("local_addr", &self.local_addr)
            .field("active_connections", &self.tracker.active_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.listener.host = "127.0.0.1".to_string();
        config.listener.port = "0".to_string();
        config
    }

    #[tokio::test]
    async fn start_moves_to_listening() {
        let mut server = ServerLifecycle::new(loopback_config(), Dispatch::none());
        assert_eq!(server.state(), LifecycleState::Created);
        assert_eq!(server.local_addr(), None);

        let addr = server.start().await.unwrap();
        assert_eq!(server.state(), LifecycleState::Listening);
        assert_eq!(server.local_addr(), Some(addr));

        server.shutdown(Duration::from_secs(1)).await.unwrap();
        assert_eq!(server.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let mut server = ServerLifecycle::new(loopback_config(), Dispatch::none());
        server.start().await.unwrap();

        let err = server.start().await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidState {
                operation: "start",
                state: LifecycleState::Listening
            }
        ));
        server.shutdown(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn invalid_config_fails_before_binding() {
        let mut config = loopback_config();
        config.listener.port.clear();
        let mut server = ServerLifecycle::new(config, Dispatch::none());

        let err = server.start().await.unwrap_err();
        assert!(matches!(err, LifecycleError::Config(_)));
        assert_eq!(server.state(), LifecycleState::Failed);
        assert_eq!(server.local_addr(), None);
    }

    #[tokio::test]
    async fn shutdown_before_start_stops_immediately() {
        let mut server = ServerLifecycle::new(loopback_config(), Dispatch::none());
        server.shutdown(Duration::from_secs(30)).await.unwrap();
        assert_eq!(server.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn accept_failure_pends_after_deliberate_shutdown() {
        let mut server = ServerLifecycle::new(loopback_config(), Dispatch::none());
        server.start().await.unwrap();
        server.shutdown(Duration::from_secs(1)).await.unwrap();

        let pending = tokio::time::timeout(Duration::from_millis(50), server.accept_failure()).await;
        assert!(pending.is_err());
    }
}
