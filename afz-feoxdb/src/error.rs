use afz_backend::BackendError;
use feoxdb::FeoxError;
use thiserror::Error;

/// Errors that can occur when using [`FeOxDb`](crate::FeOxDb).
#[derive(Debug, Error)]
pub enum FeOxDbError {
    /// An error from the underlying FeOxDB database.
    #[error("FeOxDB error: {0}")]
    FeOxDb(#[from] FeoxError),

    /// A bookkeeping record (store list, index, queue record) is not valid JSON.
    #[error("Corrupted record {key}: {source}")]
    Corrupted {
        /// Database key of the record.
        key: String,
        /// Underlying decoding error.
        source: serde_json::Error,
    },

    /// An I/O error occurred while accessing the database file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The provided configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<FeOxDbError> for BackendError {
    fn from(error: FeOxDbError) -> Self {
        match error {
            FeOxDbError::Corrupted { .. } => BackendError::InternalError(Box::new(error)),
            other => BackendError::ConnectionError(Box::new(other)),
        }
    }
}
