//! Network access.
//!
//! [`Network`] is the single seam between the worker and the outside world.
//! Strategies never talk to an HTTP client directly; they hand a
//! [`FetchRequest`] to a `Network` and get a [`ResponseSnapshot`] back.
//!
//! A response with any status, including `404` or `500`, is a *successful*
//! fetch. Only failures to obtain a response at all (DNS, refused
//! connection, timeout) are reported as [`NetworkError`].
//!
//! # Examples
//!
//! ```rust,ignore
//! use afz_core::{FetchRequest, Network, NetworkError, ResponseSnapshot};
//! use async_trait::async_trait;
//!
//! struct Offline;
//!
//! #[async_trait]
//! impl Network for Offline {
//!     async fn fetch(&self, _request: FetchRequest) -> Result<ResponseSnapshot, NetworkError> {
//!         Err(NetworkError::Connect("no route to host".into()))
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::request::FetchRequest;
use crate::response::ResponseSnapshot;

/// Failure to obtain any response from the network.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),
    /// No response arrived in time.
    #[error("request timed out")]
    Timeout,
    /// Any other transport failure.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Performs requests against the real network.
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetch `request` and buffer the whole response.
    async fn fetch(&self, request: FetchRequest) -> Result<ResponseSnapshot, NetworkError>;
}

#[async_trait]
impl<T> Network for Arc<T>
where
    T: Network + ?Sized,
{
    async fn fetch(&self, request: FetchRequest) -> Result<ResponseSnapshot, NetworkError> {
        self.as_ref().fetch(request).await
    }
}

#[async_trait]
impl<T> Network for &T
where
    T: Network + ?Sized,
{
    async fn fetch(&self, request: FetchRequest) -> Result<ResponseSnapshot, NetworkError> {
        (*self).fetch(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Network for Echo {
        async fn fetch(&self, request: FetchRequest) -> Result<ResponseSnapshot, NetworkError> {
            Ok(ResponseSnapshot::ok(request.url.to_string()))
        }
    }

    #[tokio::test]
    async fn test_arc_dyn_network_delegates() {
        let network: Arc<dyn Network> = Arc::new(Echo);
        let request = FetchRequest::get("https://afz.org/a").unwrap();
        let response = network.fetch(request).await.unwrap();
        assert_eq!(response.body_text(), "https://afz.org/a");
    }
}
