use afz_core::{FallbackKind, FetchContext, FetchRequest};
use tracing::{debug, warn};

use super::{Strategies, StrategyResult, network_first};

pub(super) async fn run(strategies: &Strategies, request: &FetchRequest) -> StrategyResult {
    let error = match network_first::run(strategies, request).await {
        Ok(served) => return Ok(served),
        Err(error) => error,
    };
    if !request.is_navigation() {
        return Err(error);
    }

    match strategies
        .caches
        .lookup_static(&strategies.offline_page)
        .await
    {
        Ok(Some(page)) => {
            debug!(url = %request.url, %error, "serving offline page");
            Ok((page, FetchContext::fallback(FallbackKind::OfflinePage)))
        }
        Ok(None) => Err(error),
        Err(store_error) => {
            warn!(url = %request.url, error = %store_error, "offline page lookup failed");
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::strategy::StrategyKind;
    use crate::strategy::tests::harness;
    use afz_core::{FallbackKind, ResponseSnapshot, ResponseSource};
    use afz_test::{get, navigate};

    const ABOUT: &str = "https://afz.org/about.html";
    const OFFLINE: &str = "https://afz.org/offline.html";

    #[tokio::test]
    async fn test_navigation_gets_offline_page() {
        let h = harness();
        h.storage
            .seed("afz-cache-v1")
            .insert(OFFLINE, ResponseSnapshot::ok("<h1>Offline</h1>"));
        h.network.set_offline(true);

        let (response, ctx) = h
            .strategies
            .execute(StrategyKind::NetworkFirstOffline, &navigate(ABOUT))
            .await
            .unwrap();

        assert_eq!(response.body_text(), "<h1>Offline</h1>");
        assert_eq!(
            ctx.source,
            ResponseSource::Fallback(FallbackKind::OfflinePage)
        );
    }

    #[tokio::test]
    async fn test_stored_page_beats_offline_page() {
        let h = harness();
        let statics = h.storage.seed("afz-cache-v1");
        statics.insert(OFFLINE, ResponseSnapshot::ok("offline"));
        statics.insert(ABOUT, ResponseSnapshot::ok("about"));
        h.network.set_offline(true);

        let (response, ctx) = h
            .strategies
            .execute(StrategyKind::NetworkFirstOffline, &navigate(ABOUT))
            .await
            .unwrap();

        assert_eq!(response.body_text(), "about");
        assert!(ctx.from_store());
    }

    #[tokio::test]
    async fn test_subresource_does_not_get_offline_page() {
        let h = harness();
        h.storage
            .seed("afz-cache-v1")
            .insert(OFFLINE, ResponseSnapshot::ok("offline"));
        h.network.set_offline(true);

        let result = h
            .strategies
            .execute(StrategyKind::NetworkFirstOffline, &get(ABOUT))
            .await;

        assert!(result.is_err());
    }
}
