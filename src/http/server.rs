//! HTTP server setup and connection handling.
//!
//! # Responsibilities
//! - Wrap the dispatch router in middleware (write timeout, tracing)
//! - Run the accept loop until drain is requested
//! - Drive each connection with HTTP/1.1 keep-alive
//! - Enforce read (request head) and idle (keep-alive) timeouts
//! - Finish in-flight requests on drain, drop the socket on force-close

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tower::ServiceExt;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::instrument::WithSubscriber;

use crate::config::TimeoutConfig;
use crate::lifecycle::shutdown::ShutdownListener;
use crate::net::listener::accept_backoff;
use crate::net::{
    Accept, ConnectionGuard, ConnectionState, ConnectionTracker, ListenerError, RequestActivity,
};

const ACCEPT_RETRY_BASE_MS: u64 = 5;
const ACCEPT_RETRY_MAX_MS: u64 = 1_000;

/// HTTP server serving one dispatch router.
#[derive(Clone)]
pub struct HttpServer {
    router: Router,
    timeouts: TimeoutConfig,
}

impl HttpServer {
    /// Create a server dispatching every request to `router`.
    pub fn new(router: Router, timeouts: TimeoutConfig) -> Self {
        let router = Self::build_router(router, &timeouts);
        Self { router, timeouts }
    }

    /// Wrap the router with the middleware layers.
    #[allow(deprecated)]
    fn build_router(router: Router, timeouts: &TimeoutConfig) -> Router {
        router
            .layer(TimeoutLayer::new(timeouts.write()))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Accept connections until `drain` fires, spawning one task per
    /// connection. The listener is closed when this returns.
    ///
    /// Transient accept errors are retried with backoff; any other accept
    /// error ends the loop.
    pub async fn run<A: Accept>(
        self,
        listener: A,
        tracker: ConnectionTracker,
        mut drain: ShutdownListener,
        force: ShutdownListener,
    ) -> Result<(), ListenerError> {
        let addr = listener.local_addr();
        tracing::debug!(address = %addr, "Accept loop started");

        let mut transient_errors: u32 = 0;
        loop {
            let accepted = tokio::select! {
                biased;
                () = drain.recv() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, remote_addr)) => {
                    transient_errors = 0;
                    let connection = self.clone().serve_connection(
                        stream,
                        remote_addr,
                        tracker.track(),
                        drain.clone(),
                        force.clone(),
                    );
                    tokio::spawn(connection.with_current_subscriber());
                }
                Err(e) if e.is_transient() => {
                    transient_errors = transient_errors.saturating_add(1);
                    let delay =
                        accept_backoff(transient_errors, ACCEPT_RETRY_BASE_MS, ACCEPT_RETRY_MAX_MS);
                    tracing::warn!(error = %e, retry_in = ?delay, "Accept error; retrying");
                    tokio::select! {
                        () = drain.recv() => break,
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }

        tracing::debug!(address = %addr, "Accept loop stopped");
        Ok(())
    }

    /// Serve one connection until the peer closes it, it times out, or
    /// shutdown ends it.
    async fn serve_connection(
        self,
        stream: TcpStream,
        remote_addr: SocketAddr,
        guard: ConnectionGuard,
        mut drain: ShutdownListener,
        mut force: ShutdownListener,
    ) {
        let connection_id = guard.id();
        let activity = RequestActivity::new();

        let router = self.router;
        let requests = activity.clone();
        let service = service_fn(move |mut request: Request<Incoming>| {
            request.extensions_mut().insert(ConnectInfo(remote_addr));
            let in_flight = requests.begin();
            let router = router.clone();
            async move {
                let response = router.oneshot(request).await;
                drop(in_flight);
                response
            }
        });

        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .header_read_timeout(self.timeouts.read())
            .keep_alive(true);
        let connection = builder.serve_connection(TokioIo::new(stream), service);
        tokio::pin!(connection);

        let idle_timeout = self.timeouts.idle();
        let mut state = ConnectionState::Active;
        while state != ConnectionState::Closed {
            let idle_at = activity
                .idle_deadline(idle_timeout)
                .unwrap_or_else(|| Instant::now() + idle_timeout);

            tokio::select! {
                result = connection.as_mut() => {
                    if let Err(e) = result {
                        tracing::debug!(connection_id = %connection_id, error = %e, "Connection error");
                    }
                    state = ConnectionState::Closed;
                }
                () = drain.recv(), if state == ConnectionState::Active => {
                    connection.as_mut().graceful_shutdown();
                    state = ConnectionState::Draining;
                }
                () = tokio::time::sleep_until(idle_at), if state == ConnectionState::Active => {
                    // A request may have started since the deadline was computed.
                    if activity.idle_deadline(idle_timeout).is_some_and(|at| at <= Instant::now()) {
                        tracing::trace!(connection_id = %connection_id, "Closing idle connection");
                        connection.as_mut().graceful_shutdown();
                        state = ConnectionState::Draining;
                    }
                }
                () = force.recv() => {
                    tracing::warn!(
                        connection_id = %connection_id,
                        remote_addr = %remote_addr,
                        in_flight = activity.in_flight(),
                        "Force-closing connection"
                    );
                    state = ConnectionState::Closed;
                }
            }
        }

        drop(guard);
    }
}
