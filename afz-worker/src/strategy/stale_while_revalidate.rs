use afz_core::{FetchContext, FetchRequest};
use tracing::{debug, trace};

use super::{Strategies, StrategyResult};
use crate::offload::OffloadKey;

pub(super) async fn run(strategies: &Strategies, request: &FetchRequest) -> StrategyResult {
    let Some((response, store)) = strategies.cached(request).await else {
        let response = strategies.fetch(request).await?;
        strategies.remember(request, &response).await;
        return Ok((response, FetchContext::network()));
    };

    let background = strategies.clone();
    let revalidate = request.clone_without_body();
    let spawned = strategies.offload.spawn_with_key(
        OffloadKey::Request(request.key()),
        async move {
            match background.fetch(&revalidate).await {
                Ok(fresh) => background.remember(&revalidate, &fresh).await,
                Err(error) => {
                    debug!(url = %revalidate.url, %error, "background revalidation failed")
                }
            }
        },
    );
    if !spawned {
        trace!(url = %request.url, "revalidation skipped");
    }

    Ok((response, FetchContext::stale(store)))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::strategy::StrategyKind;
    use crate::strategy::tests::harness;
    use afz_core::{CacheStatus, ResponseSnapshot};
    use afz_test::get;

    const WIDGET: &str = "https://cdn.example.net/widget";

    #[tokio::test]
    async fn test_returns_stale_then_refreshes() {
        let h = harness();
        h.storage
            .seed("afz-runtime-v1")
            .insert(WIDGET, ResponseSnapshot::ok("v1"));
        h.network
            .respond(WIDGET, 200, "v2")
            .delay(WIDGET, Duration::from_millis(50));

        let started = tokio::time::Instant::now();
        let (response, ctx) = h
            .strategies
            .execute(StrategyKind::StaleWhileRevalidate, &get(WIDGET))
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_millis(50));
        assert_eq!(response.body_text(), "v1");
        assert_eq!(ctx.status, CacheStatus::Stale);

        h.offload.wait_all().await;
        let stored = h.storage.store("afz-runtime-v1").unwrap().get(WIDGET).unwrap();
        assert_eq!(stored.body_text(), "v2");
    }

    #[tokio::test]
    async fn test_failed_revalidation_keeps_entry() {
        let h = harness();
        h.storage
            .seed("afz-runtime-v1")
            .insert(WIDGET, ResponseSnapshot::ok("v1"));
        h.network.respond(WIDGET, 503, "down");

        h.strategies
            .execute(StrategyKind::StaleWhileRevalidate, &get(WIDGET))
            .await
            .unwrap();
        h.offload.wait_all().await;

        let stored = h.storage.store("afz-runtime-v1").unwrap().get(WIDGET).unwrap();
        assert_eq!(stored.body_text(), "v1");
        assert_eq!(h.network.calls(WIDGET), 1);
    }

    #[tokio::test]
    async fn test_miss_awaits_network() {
        let h = harness();
        h.network.respond(WIDGET, 200, "fresh");

        let (response, ctx) = h
            .strategies
            .execute(StrategyKind::StaleWhileRevalidate, &get(WIDGET))
            .await
            .unwrap();

        assert_eq!(response.body_text(), "fresh");
        assert_eq!(ctx.status, CacheStatus::Miss);
        assert!(h.storage.store("afz-runtime-v1").unwrap().contains(WIDGET));
    }

    #[tokio::test]
    async fn test_concurrent_hits_revalidate_once() {
        let h = harness();
        h.storage
            .seed("afz-runtime-v1")
            .insert(WIDGET, ResponseSnapshot::ok("v1"));
        h.network
            .respond(WIDGET, 200, "v2")
            .delay(WIDGET, Duration::from_millis(50));

        for _ in 0..3 {
            h.strategies
                .execute(StrategyKind::StaleWhileRevalidate, &get(WIDGET))
                .await
                .unwrap();
        }
        h.offload.wait_all().await;

        assert_eq!(h.network.calls(WIDGET), 1);
    }
}
