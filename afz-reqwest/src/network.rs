//! [`Network`] implementation over `reqwest::Client`.

use std::time::Duration;

use afz_core::{FetchRequest, Network, NetworkError, ResponseSnapshot};
use async_trait::async_trait;

/// Fetches requests with a shared `reqwest::Client`.
///
/// Cloning is cheap; clones share the client's connection pool.
///
/// ```no_run
/// use std::time::Duration;
/// use afz_reqwest::ReqwestNetwork;
///
/// let network = ReqwestNetwork::builder()
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// # Ok::<(), afz_core::NetworkError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct ReqwestNetwork {
    client: reqwest::Client,
}

impl ReqwestNetwork {
    /// Wraps an already configured client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Starts building a network with its own client.
    pub fn builder() -> ReqwestNetworkBuilder {
        ReqwestNetworkBuilder::default()
    }

    /// The underlying client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

/// Builder for [`ReqwestNetwork`].
#[derive(Debug, Default)]
pub struct ReqwestNetworkBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ReqwestNetworkBuilder {
    /// Total time allowed for one request, including reading the body.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Time allowed for establishing the connection.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// `User-Agent` sent with every request.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Builds the client.
    pub fn build(self) -> Result<ReqwestNetwork, NetworkError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }
        let client = builder.build().map_err(map_error)?;
        Ok(ReqwestNetwork { client })
    }
}

fn map_error(error: reqwest::Error) -> NetworkError {
    if error.is_timeout() {
        NetworkError::Timeout
    } else if error.is_connect() {
        NetworkError::Connect(error.to_string())
    } else {
        NetworkError::Other(Box::new(error))
    }
}

#[async_trait]
impl Network for ReqwestNetwork {
    async fn fetch(&self, request: FetchRequest) -> Result<ResponseSnapshot, NetworkError> {
        let FetchRequest {
            method,
            url,
            headers,
            body,
            ..
        } = request;

        tracing::trace!(%method, %url, "network fetch");
        let mut builder = self.client.request(method, url.as_str()).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(map_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(map_error)?;

        tracing::trace!(%url, status = status.as_u16(), bytes = body.len(), "network response");
        Ok(ResponseSnapshot::new(status, headers, body))
    }
}
