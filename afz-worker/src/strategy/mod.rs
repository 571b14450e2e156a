//! Caching strategies.
//!
//! All four strategies read through the current generation's stores (static
//! first, then runtime) and write fresh `200 OK` responses to the runtime
//! store. None of them ever stores another status.
//!
//! | Strategy | Store hit | Store miss | Network down |
//! |---|---|---|---|
//! | [`CacheFirst`](StrategyKind::CacheFirst) | served, no fetch | fetched, stored on 200 | error |
//! | [`NetworkFirst`](StrategyKind::NetworkFirst) | only when offline | fetched, stored on 200 | stored copy or error |
//! | [`NetworkFirstOffline`](StrategyKind::NetworkFirstOffline) | only when offline | fetched, stored on 200 | stored copy, offline page, or error |
//! | [`StaleWhileRevalidate`](StrategyKind::StaleWhileRevalidate) | served, refreshed in background | fetched, stored on 200 | stored copy or error |

mod cache_first;
mod network_first;
mod network_first_offline;
mod stale_while_revalidate;

use std::fmt;
use std::sync::Arc;

use afz_backend::{BackendError, PutStatus};
use afz_core::{FetchContext, FetchRequest, Network, NetworkError, ResponseSnapshot, StoreName};
use thiserror::Error;
use tracing::{Instrument, debug, debug_span, warn};
use url::Url;

use crate::caches::GenerationCaches;
use crate::offload::OffloadManager;

/// The four caching strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Serve from the store, fetch only on a miss.
    CacheFirst,
    /// Fetch, fall back to the store when the network fails.
    NetworkFirst,
    /// Network-first, then the offline page for navigations.
    NetworkFirstOffline,
    /// Serve from the store and refresh it in the background.
    StaleWhileRevalidate,
}

impl StrategyKind {
    /// Returns the kind as a string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::CacheFirst => "cache_first",
            StrategyKind::NetworkFirst => "network_first",
            StrategyKind::NetworkFirstOffline => "network_first_offline",
            StrategyKind::StaleWhileRevalidate => "stale_while_revalidate",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a strategy could not produce a response.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// The network failed and no stored copy was available.
    #[error(transparent)]
    Network(#[from] NetworkError),
    /// The store failed in a way the strategy could not work around.
    #[error(transparent)]
    Store(#[from] BackendError),
}

/// Result of a strategy run.
pub type StrategyResult = Result<(ResponseSnapshot, FetchContext), StrategyError>;

/// Everything a strategy needs to serve a request.
#[derive(Clone)]
pub struct Strategies {
    caches: GenerationCaches,
    network: Arc<dyn Network>,
    offload: OffloadManager,
    offline_page: Url,
}

impl Strategies {
    pub fn new(
        caches: GenerationCaches,
        network: Arc<dyn Network>,
        offload: OffloadManager,
        offline_page: Url,
    ) -> Self {
        Self {
            caches,
            network,
            offload,
            offline_page,
        }
    }

    /// Serves `request` with the strategy `kind`.
    pub async fn execute(&self, kind: StrategyKind, request: &FetchRequest) -> StrategyResult {
        let result = match kind {
            StrategyKind::CacheFirst => {
                cache_first::run(self, request)
                    .instrument(debug_span!("strategy.cache_first"))
                    .await
            }
            StrategyKind::NetworkFirst => {
                network_first::run(self, request)
                    .instrument(debug_span!("strategy.network_first"))
                    .await
            }
            StrategyKind::NetworkFirstOffline => {
                network_first_offline::run(self, request)
                    .instrument(debug_span!("strategy.network_first_offline"))
                    .await
            }
            StrategyKind::StaleWhileRevalidate => {
                stale_while_revalidate::run(self, request)
                    .instrument(debug_span!("strategy.stale_while_revalidate"))
                    .await
            }
        };
        crate::metrics::record_strategy(kind, result.as_ref().ok().map(|(_, ctx)| ctx));
        result
    }

    /// Stored copy of `request`, if any.
    ///
    /// A failing store counts as a miss: the request can still be served
    /// from the network.
    async fn cached(&self, request: &FetchRequest) -> Option<(ResponseSnapshot, StoreName)> {
        match self.caches.lookup(request).await {
            Ok(found) => found,
            Err(error) => {
                warn!(url = %request.url, %error, "store lookup failed");
                None
            }
        }
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<ResponseSnapshot, NetworkError> {
        self.network.fetch(request.clone()).await
    }

    /// Writes `response` to the runtime store when it is a `200 OK`.
    ///
    /// A failed write is logged; the response is still returned to the page.
    async fn remember(&self, request: &FetchRequest, response: &ResponseSnapshot) {
        match self.caches.store_runtime(request, response).await {
            Ok(PutStatus::Stored) => debug!(url = %request.url, "runtime store updated"),
            Ok(PutStatus::Skipped) => {}
            Err(error) => warn!(url = %request.url, %error, "runtime store write failed"),
        }
    }
}

impl fmt::Debug for Strategies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategies")
            .field("caches", &self.caches)
            .field("offload", &self.offload)
            .field("offline_page", &self.offline_page.as_str())
            .finish()
    }
}
