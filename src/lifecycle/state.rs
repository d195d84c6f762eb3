//! Server lifecycle state machine.
//!
//! ```text
//! Created ──start──▶ Listening ──shutdown──▶ ShuttingDown ──drained──▶ Stopped
//!    │                   │                        │
//!    │ bind/config       │ accept failure         │ deadline exceeded
//!    ▼                   ▼                        ▼
//!  Failed              Failed                   Failed
//! ```
//!
//! `Created → Stopped` covers shutting down a server that never started.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use crate::lifecycle::error::LifecycleError;

/// Lifecycle state of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Listening,
    ShuttingDown,
    Stopped,
    Failed,
}

impl LifecycleState {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Created, Listening)
                | (Created, Stopped)
                | (Created, Failed)
                | (Listening, ShuttingDown)
                | (Listening, Failed)
                | (ShuttingDown, Stopped)
                | (ShuttingDown, Failed)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Created => "created",
            LifecycleState::Listening => "listening",
            LifecycleState::ShuttingDown => "shutting down",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Shared, observable lifecycle state with compare-and-set transitions.
#[derive(Debug, Clone)]
pub(crate) struct StateCell {
    tx: Arc<watch::Sender<LifecycleState>>,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(LifecycleState::Created);
        Self { tx: Arc::new(tx) }
    }

    pub(crate) fn get(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.tx.subscribe()
    }

    /// Atomically move to `next`, or report the state that forbids it.
    pub(crate) fn transition(
        &self,
        operation: &'static str,
        next: LifecycleState,
    ) -> Result<(), LifecycleError> {
        let mut rejected = None;
        self.tx.send_if_modified(|state| {
            if state.can_transition_to(next) {
                tracing::debug!(from = %state, to = %next, "Lifecycle transition");
                *state = next;
                true
            } else {
                rejected = Some(*state);
                false
            }
        });

        match rejected {
            None => Ok(()),
            Some(state) => Err(LifecycleError::InvalidState { operation, state }),
        }
    }
}
