#![warn(missing_docs)]
//! Persistent storage for the afz offline worker on the
//! [FeOxDB](https://docs.rs/feoxdb) embedded key-value store.
//!
//! One [`FeOxDb`] file holds both the response stores
//! ([`FeOxDbStorage`], a `CacheStorage`) and the pending form submissions
//! ([`FeOxDbQueue`], a `SubmissionQueue`), so a worker restart keeps both
//! its cached generations and its undelivered forms.
//!
//! All database calls run on the blocking thread pool.

mod db;
mod error;
mod queue;
mod storage;

pub use db::{FeOxDb, FeOxDbBuilder};
pub use error::FeOxDbError;
pub use queue::FeOxDbQueue;
pub use storage::{FeOxDbStorage, FeOxDbStore};
