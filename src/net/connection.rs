//! Connection state machine and lifecycle tracking.
//!
//! # Responsibilities
//! - Track connection state (Active → Draining → Closed)
//! - Generate unique connection IDs for tracing
//! - Count live connections so shutdown can wait for them
//! - Track per-connection request activity for the idle timeout

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    fn next() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Connection state for lifecycle tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connection is active and processing requests.
    Active,
    /// Connection is draining (no new requests, finishing in-flight).
    Draining,
    /// Connection is closed.
    Closed,
}

/// Tracks live connections for graceful shutdown.
///
/// Waiters are woken through a [`Notify`] when the count drops to zero.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new live connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            idle: Arc::clone(&self.idle),
            id: ConnectionId::next(),
        }
    }

    /// Get current live connection count.
    pub fn active_count(&self) -> usize {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Wait until no connection is live. Returns immediately if none are.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent last drop is not missed.
            notified.as_mut().enable();

            if self.active_count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements the live count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicUsize>,
    idle: Arc<Notify>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.active_count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}

/// Request activity on a single connection.
///
/// A connection is idle when no request is in flight; the idle clock starts
/// when the last request finished (or when the connection was opened).
#[derive(Debug, Clone)]
pub struct RequestActivity {
    inner: Arc<ActivityInner>,
}

#[derive(Debug)]
struct ActivityInner {
    opened_at: Instant,
    in_flight: AtomicUsize,
    /// Milliseconds since `opened_at` of the last request start or finish.
    last_active_ms: AtomicU64,
}

impl RequestActivity {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ActivityInner {
                opened_at: Instant::now(),
                in_flight: AtomicUsize::new(0),
                last_active_ms: AtomicU64::new(0),
            }),
        }
    }

    /// Mark a request as started. The returned guard marks it finished.
    pub fn begin(&self) -> RequestGuard {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        self.touch();
        RequestGuard {
            activity: self.clone(),
        }
    }

    /// Number of requests currently being handled on this connection.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// When the connection becomes idle for `idle`, or `None` while a
    /// request is in flight.
    pub fn idle_deadline(&self, idle: Duration) -> Option<Instant> {
        if self.in_flight() > 0 {
            return None;
        }
        let last_active = Duration::from_millis(self.inner.last_active_ms.load(Ordering::SeqCst));
        Some(self.inner.opened_at + last_active + idle)
    }

    fn touch(&self) {
        let elapsed = self.inner.opened_at.elapsed().as_millis();
        self.inner
            .last_active_ms
            .store(u64::try_from(elapsed).unwrap_or(u64::MAX), Ordering::SeqCst);
    }
}

impl Default for RequestActivity {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks one in-flight request; finishing it restarts the idle clock.
#[derive(Debug)]
pub struct RequestGuard {
    activity: RequestActivity,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.activity.touch();
        self.activity.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
