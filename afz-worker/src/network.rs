//! Network access with an upper bound per fetch.

use std::sync::Arc;
use std::time::Duration;

use afz_core::{FetchRequest, Network, NetworkError, ResponseSnapshot};
use async_trait::async_trait;

/// Wraps a [`Network`] and fails fetches that take longer than `timeout`
/// with [`NetworkError::Timeout`].
#[derive(Clone)]
pub struct TimeoutNetwork {
    inner: Arc<dyn Network>,
    timeout: Duration,
}

impl TimeoutNetwork {
    pub fn new(inner: Arc<dyn Network>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Wraps `network` when `timeout` is set, returns it unchanged otherwise.
    pub fn wrap(network: Arc<dyn Network>, timeout: Option<Duration>) -> Arc<dyn Network> {
        match timeout {
            Some(timeout) => Arc::new(Self::new(network, timeout)),
            None => network,
        }
    }
}

#[async_trait]
impl Network for TimeoutNetwork {
    async fn fetch(&self, request: FetchRequest) -> Result<ResponseSnapshot, NetworkError> {
        let url = request.url.clone();
        match tokio::time::timeout(self.timeout, self.inner.fetch(request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(%url, timeout_ms = self.timeout.as_millis(), "fetch timed out");
                Err(NetworkError::Timeout)
            }
        }
    }
}
