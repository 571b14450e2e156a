//! Error types for store operations.

use afz_core::StoreName;
use thiserror::Error;

use crate::format::FormatError;

/// Error type for store operations.
///
/// This enum categorizes errors that can occur while talking to a store
/// implementation into distinct groups for appropriate handling.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Internal store error, state or computation error.
    ///
    /// Any error not related to I/O with an external system.
    #[error(transparent)]
    InternalError(Box<dyn std::error::Error + Send + Sync>),

    /// I/O error while talking to the underlying storage engine.
    #[error(transparent)]
    ConnectionError(Box<dyn std::error::Error + Send + Sync>),

    /// Serialization or deserialization error.
    #[error(transparent)]
    FormatError(#[from] FormatError),

    /// The named store is unknown to the storage and could not be created.
    #[error("store {0} is not available")]
    StoreUnavailable(StoreName),
}

impl BackendError {
    /// Wraps any error as an [`InternalError`](BackendError::InternalError).
    pub fn internal<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BackendError::InternalError(Box::new(error))
    }
}
