//! Offload trait for background task execution.
//!
//! This module provides the [`Offload`] trait which abstracts over
//! different implementations for spawning background tasks, such as the
//! revalidation fetch of the stale-while-revalidate strategy.

use std::future::Future;

use smol_str::SmolStr;

use crate::key::RequestKey;

/// Trait for spawning background tasks.
///
/// The primary implementation is `OffloadManager` in the `afz-worker` crate,
/// which tracks in-flight tasks, applies timeouts and deduplicates work per
/// request key.
///
/// # Clone bound
///
/// Implementors should use `Arc` internally to ensure all cloned instances
/// share the same configuration and state.
///
/// # Example
///
/// ```ignore
/// use afz_core::Offload;
///
/// fn refresh_later<O: Offload>(offload: &O, url: String) {
///     offload.spawn("revalidate", async move {
///         println!("refreshing {url}");
///     });
/// }
/// ```
pub trait Offload: Send + Sync + Clone {
    /// Spawn a future to be executed in the background.
    ///
    /// * `kind` - A label categorizing the task type (e.g., "revalidate").
    ///   Used for metrics and tracing.
    /// * `future` - The future to execute. Must be `Send + 'static` as it may
    ///   run on a different thread.
    fn spawn<F>(&self, kind: impl Into<SmolStr>, future: F)
    where
        F: Future<Output = ()> + Send + 'static;

    /// Spawn a future tied to a request key.
    ///
    /// Implementations may skip the task when another one for the same key is
    /// still running. Returns `true` if the task was spawned.
    fn spawn_for_key<F>(&self, key: RequestKey, future: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let _ = key;
        self.spawn("keyed", future);
        true
    }
}
