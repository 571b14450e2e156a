//! Worker lifecycle states.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

use crate::error::WorkerError;

/// Lifecycle states of a worker.
///
/// ```text
/// Parsed -> Installing -> Installed -> Activating -> Activated
///              |                           |
///              +--------> Redundant <------+ (failure or shutdown)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Built, nothing installed yet.
    Parsed,
    /// Populating the static store.
    Installing,
    /// Installed, waiting to activate.
    Installed,
    /// Evicting stale generations and claiming clients.
    Activating,
    /// Active and serving fetches.
    Activated,
    /// Failed or shut down; handles nothing anymore.
    Redundant,
}

impl WorkerState {
    /// Only an activated worker serves fetches.
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Redundant)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        })
    }
}

/// Current state plus the skip-waiting flag.
///
/// State changes are published on a `watch` channel so callers can wait
/// for a worker to become active.
#[derive(Debug)]
pub struct Lifecycle {
    state: watch::Sender<WorkerState>,
    skip_waiting: AtomicBool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(WorkerState::Parsed);
        Self {
            state,
            skip_waiting: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Moves from `from` to `to`, or fails with the state found instead.
    ///
    /// The check and the move happen atomically, so two concurrent installs
    /// cannot both start.
    pub(crate) fn transition(
        &self,
        action: &'static str,
        from: WorkerState,
        to: WorkerState,
    ) -> Result<(), WorkerError> {
        let mut found = from;
        let moved = self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                found = *state;
                false
            }
        });
        if moved {
            tracing::debug!(%from, %to, "worker state changed");
            Ok(())
        } else {
            Err(WorkerError::InvalidState {
                action,
                state: found,
            })
        }
    }

    pub(crate) fn set(&self, state: WorkerState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "worker state changed");
        }
    }

    /// Asks for activation without waiting for old clients to close.
    pub fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    pub fn is_skip_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }
}
