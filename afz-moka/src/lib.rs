#![warn(missing_docs)]
//! In-memory response stores for the afz offline worker.
//!
//! [`MokaStorage`] implements `CacheStorage` with one Moka cache per named
//! store. It is the default storage for tests and for deployments where
//! losing every store on restart is acceptable.

mod builder;
mod store;

pub use builder::{ByteCapacity, EntryCapacity, MokaStorageBuilder, NoCapacity};
pub use moka::policy::EvictionPolicy;
pub use store::{MokaStorage, MokaStore};
