//! Test support for the afz workspace.
//!
//! - [`MockNetwork`]: a scripted [`Network`](afz_core::Network) that counts calls
//! - [`MockStorage`] / [`MockStore`]: an in-memory `CacheStorage` with
//!   counters and injectable failures
//! - [`tracing`]: span capture for asserting on worker spans

pub mod network;
pub mod storage;
pub mod tracing;

pub use network::MockNetwork;
pub use storage::{MockStorage, MockStore, StoreCounters};

/// Builds a `GET` request for `url`.
///
/// # Panics
///
/// Panics if `url` is not an absolute URL.
pub fn get(url: &str) -> afz_core::FetchRequest {
    afz_core::FetchRequest::get(url).expect("absolute test URL")
}

/// Builds a navigation request for `url`.
pub fn navigate(url: &str) -> afz_core::FetchRequest {
    get(url).navigate()
}

/// Builds an image request for `url`.
pub fn image(url: &str) -> afz_core::FetchRequest {
    get(url).with_destination(afz_core::Destination::Image)
}
