//! Last-resort responses.
//!
//! When a strategy gives up, the page still gets an answer. Navigations get
//! the pre-cached offline page, images the pre-cached placeholder, and
//! everything else a plain `503`. Only the static store is consulted; the
//! network is never touched here.

use afz_core::{FallbackKind, FetchRequest, ResponseSnapshot};
use http::StatusCode;
use tracing::warn;
use url::Url;

use crate::caches::GenerationCaches;

/// Body of the synthetic `503` response.
pub const UNAVAILABLE_BODY: &str = "Offline - content not available";

/// Resolves fallback responses from the static store.
#[derive(Debug, Clone)]
pub struct OfflineFallback {
    caches: GenerationCaches,
    offline_page: Url,
    placeholder_image: Url,
}

impl OfflineFallback {
    pub fn new(caches: GenerationCaches, offline_page: Url, placeholder_image: Url) -> Self {
        Self {
            caches,
            offline_page,
            placeholder_image,
        }
    }

    /// Picks the substitute response for `request`.
    pub async fn resolve(&self, request: &FetchRequest) -> (ResponseSnapshot, FallbackKind) {
        let candidate = if request.is_navigation() {
            Some((&self.offline_page, FallbackKind::OfflinePage))
        } else if request.is_image() {
            Some((&self.placeholder_image, FallbackKind::PlaceholderImage))
        } else {
            None
        };

        if let Some((url, kind)) = candidate {
            match self.caches.lookup_static(url).await {
                Ok(Some(response)) => return (response, kind),
                Ok(None) => {}
                Err(error) => warn!(%url, %error, "fallback lookup failed"),
            }
        }
        (unavailable(), FallbackKind::Unavailable)
    }
}

/// The synthetic `503 Service Unavailable` response.
pub fn unavailable() -> ResponseSnapshot {
    ResponseSnapshot::text(StatusCode::SERVICE_UNAVAILABLE, UNAVAILABLE_BODY)
}
