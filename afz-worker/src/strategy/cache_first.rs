use afz_core::{FetchContext, FetchRequest};

use super::{Strategies, StrategyResult};

pub(super) async fn run(strategies: &Strategies, request: &FetchRequest) -> StrategyResult {
    if let Some((response, store)) = strategies.cached(request).await {
        return Ok((response, FetchContext::hit(store)));
    }

    let response = strategies.fetch(request).await?;
    strategies.remember(request, &response).await;
    Ok((response, FetchContext::network()))
}

#[cfg(test)]
mod tests {
    use crate::strategy::StrategyKind;
    use crate::strategy::tests::harness;
    use afz_core::{CacheStatus, ResponseSnapshot};
    use afz_test::get;

    const LOGO: &str = "https://afz.org/img/logo.png";

    #[tokio::test]
    async fn test_hit_skips_network() {
        let h = harness();
        h.storage
            .seed("afz-cache-v1")
            .insert(LOGO, ResponseSnapshot::ok("png"));

        let (response, ctx) = h
            .strategies
            .execute(StrategyKind::CacheFirst, &get(LOGO))
            .await
            .unwrap();

        assert_eq!(response.body_text(), "png");
        assert_eq!(ctx.status, CacheStatus::Hit);
        assert_eq!(h.network.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_miss_fetches_once_then_hits() {
        let h = harness();
        h.network.respond(LOGO, 200, "png");

        for _ in 0..3 {
            h.strategies
                .execute(StrategyKind::CacheFirst, &get(LOGO))
                .await
                .unwrap();
        }

        assert_eq!(h.network.calls(LOGO), 1);
        assert!(h.storage.store("afz-runtime-v1").unwrap().contains(LOGO));
    }

    #[tokio::test]
    async fn test_error_status_returned_but_not_stored() {
        let h = harness();
        h.network.respond(LOGO, 404, "missing");

        let (response, _) = h
            .strategies
            .execute(StrategyKind::CacheFirst, &get(LOGO))
            .await
            .unwrap();

        assert_eq!(response.status(), 404);
        assert!(!h.storage.store("afz-runtime-v1").unwrap().contains(LOGO));
    }

    #[tokio::test]
    async fn test_network_error_propagates() {
        let h = harness();
        h.network.fail(LOGO);
        assert!(
            h.strategies
                .execute(StrategyKind::CacheFirst, &get(LOGO))
                .await
                .is_err()
        );
    }
}
