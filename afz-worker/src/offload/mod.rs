//! Background task execution.
//!
//! The stale-while-revalidate strategy answers from the store right away and
//! refreshes the entry afterwards. That refresh runs here, detached from the
//! fetch that triggered it, so the page never waits for it.
//!
//! ```ignore
//! use afz_worker::offload::{OffloadConfig, OffloadKey, OffloadManager};
//!
//! let manager = OffloadManager::new(OffloadConfig::default());
//! manager.spawn_with_key(OffloadKey::Request(request.key()), async move {
//!     // revalidate
//! });
//! ```

mod manager;
mod policy;

pub use manager::{OffloadHandle, OffloadKey, OffloadManager};
pub use policy::{OffloadConfig, OffloadConfigBuilder, TimeoutPolicy};
