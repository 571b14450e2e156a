//! Scripted network for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use afz_core::{FetchRequest, Network, NetworkError, ResponseSnapshot};
use async_trait::async_trait;
use dashmap::DashMap;
use http::{HeaderMap, StatusCode};

#[derive(Debug, Clone)]
enum Reply {
    Respond(ResponseSnapshot),
    Fail,
}

#[derive(Debug, Default)]
struct Route {
    /// One-shot replies consumed first, in order.
    queued: VecDeque<Reply>,
    /// Reply used once the queue is empty.
    fallback: Option<Reply>,
    delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct Inner {
    routes: DashMap<String, Route>,
    calls: DashMap<String, usize>,
    total: AtomicUsize,
    offline: AtomicBool,
    requests: Mutex<Vec<FetchRequest>>,
}

/// A [`Network`] whose answers are scripted per URL.
///
/// Unknown URLs fail with [`NetworkError::Connect`]. Cloning is cheap and
/// every clone shares the same script and counters.
///
/// ```
/// use afz_test::MockNetwork;
///
/// let network = MockNetwork::new();
/// network.respond("https://afz.org/", 200, "<h1>Home</h1>");
/// network.fail("https://afz.org/api/news");
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockNetwork {
    inner: Arc<Inner>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answers `url` with `status` and `body`.
    pub fn respond(&self, url: &str, status: u16, body: impl Into<bytes::Bytes>) -> &Self {
        self.respond_with(url, snapshot(status, body))
    }

    /// Always answers `url` with `response`.
    pub fn respond_with(&self, url: &str, response: ResponseSnapshot) -> &Self {
        self.inner.routes.entry(url.to_owned()).or_default().fallback =
            Some(Reply::Respond(response));
        self
    }

    /// Answers the next call for `url` with `status` and `body`, then falls
    /// back to the standing reply.
    pub fn respond_once(&self, url: &str, status: u16, body: impl Into<bytes::Bytes>) -> &Self {
        self.inner
            .routes
            .entry(url.to_owned())
            .or_default()
            .queued
            .push_back(Reply::Respond(snapshot(status, body)));
        self
    }

    /// Always fails `url` with a connection error.
    pub fn fail(&self, url: &str) -> &Self {
        self.inner.routes.entry(url.to_owned()).or_default().fallback = Some(Reply::Fail);
        self
    }

    /// Fails the next call for `url`.
    pub fn fail_once(&self, url: &str) -> &Self {
        self.inner
            .routes
            .entry(url.to_owned())
            .or_default()
            .queued
            .push_back(Reply::Fail);
        self
    }

    /// Delays every answer for `url`.
    pub fn delay(&self, url: &str, delay: Duration) -> &Self {
        self.inner.routes.entry(url.to_owned()).or_default().delay = Some(delay);
        self
    }

    /// While offline every call fails, whatever was scripted.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of calls made for `url`.
    pub fn calls(&self, url: &str) -> usize {
        self.inner.calls.get(url).map(|c| *c).unwrap_or(0)
    }

    /// Number of calls made for any URL.
    pub fn total_calls(&self) -> usize {
        self.inner.total.load(Ordering::SeqCst)
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.inner.requests.lock().unwrap().clone()
    }

    fn next_reply(&self, url: &str) -> (Option<Reply>, Option<Duration>) {
        match self.inner.routes.get_mut(url) {
            Some(mut route) => {
                let delay = route.delay;
                let reply = route.queued.pop_front().or_else(|| route.fallback.clone());
                (reply, delay)
            }
            None => (None, None),
        }
    }
}

fn snapshot(status: u16, body: impl Into<bytes::Bytes>) -> ResponseSnapshot {
    let status = StatusCode::from_u16(status).expect("valid status code");
    ResponseSnapshot::new(status, HeaderMap::new(), body)
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: FetchRequest) -> Result<ResponseSnapshot, NetworkError> {
        let url = request.url.to_string();
        *self.inner.calls.entry(url.clone()).or_insert(0) += 1;
        self.inner.total.fetch_add(1, Ordering::SeqCst);
        self.inner.requests.lock().unwrap().push(request);

        let (reply, delay) = self.next_reply(&url);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::Connect(format!("offline: {url}")));
        }
        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail) => Err(NetworkError::Connect(format!("scripted failure: {url}"))),
            None => Err(NetworkError::Connect(format!("no route to {url}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::get;

    #[tokio::test]
    async fn test_once_then_standing_reply() {
        let network = MockNetwork::new();
        network
            .respond("https://afz.org/a", 200, "standing")
            .respond_once("https://afz.org/a", 500, "once");

        let first = network.fetch(get("https://afz.org/a")).await.unwrap();
        let second = network.fetch(get("https://afz.org/a")).await.unwrap();
        assert_eq!(first.status(), 500);
        assert_eq!(second.body_text(), "standing");
        assert_eq!(network.calls("https://afz.org/a"), 2);
    }

    #[tokio::test]
    async fn test_unknown_url_fails() {
        let network = MockNetwork::new();
        assert!(network.fetch(get("https://afz.org/nowhere")).await.is_err());
        assert_eq!(network.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_offline_overrides_script() {
        let network = MockNetwork::new();
        network.respond("https://afz.org/", 200, "home");
        network.set_offline(true);
        assert!(network.fetch(get("https://afz.org/")).await.is_err());
    }
}
