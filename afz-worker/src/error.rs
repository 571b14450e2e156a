//! Worker error types.

use afz_backend::BackendError;
use afz_core::StoreName;
use thiserror::Error;

use crate::config::ConfigError;
use crate::lifecycle::WorkerState;

/// Errors surfaced by lifecycle events.
///
/// Fetches never produce one of these: every failure while serving a request
/// ends in an offline fallback response instead.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The static store of the current generation could not be opened.
    #[error("cannot open static store {store}: {source}")]
    StaticStore {
        /// Name of the store.
        store: StoreName,
        /// Storage error.
        #[source]
        source: BackendError,
    },

    /// The event is not allowed in the current lifecycle state.
    #[error("cannot {action} a worker that is {state}")]
    InvalidState {
        /// The rejected action.
        action: &'static str,
        /// State at the time of the request.
        state: WorkerState,
    },

    /// Activation must wait for pages controlled by another version.
    #[error("activation waits for {clients} page(s) controlled by another version")]
    Waiting {
        /// Pages still controlled by the previous version.
        clients: usize,
    },

    /// Storage or queue failure.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A form submission could not be encoded.
    #[error("cannot encode submission: {0}")]
    Encode(#[from] serde_json::Error),
}
