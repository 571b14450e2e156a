#![warn(missing_docs)]
//! Storage traits for the afz offline worker.
//!
//! If you want to plug in your own storage engine, you are in the right place.
//!
//! - [`Store`] is one named store mapping request keys to response snapshots.
//! - [`CacheStore`] adds request-level `match_request` / `put` on top of any
//!   store and enforces the storage rules (GET only, status 200 only).
//! - [`CacheStorage`] is the set of named stores a worker can open, list and
//!   delete.
//! - [`SubmissionQueue`] keeps form submissions that still need delivering.
//!
//! Implementations live in `afz-moka` (in memory) and `afz-feoxdb`
//! (persistent). [`MemoryQueue`] is a ready-made in-memory queue.
mod backend;
mod error;
pub mod format;
mod queue;

pub use backend::{BackendResult, CacheStorage, CacheStore, PutStatus, Store};
pub use error::BackendError;
pub use format::{BincodeFormat, Format, FormatError, FormatTypeId, JsonFormat};
pub use queue::{MemoryQueue, PendingSubmission, SubmissionQueue};

/// Status of a delete operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStatus {
    /// Record(s) successfully deleted.
    Deleted(u32),
    /// Record already missing.
    Missing,
}
