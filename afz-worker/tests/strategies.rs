//! Request handling of an active worker, end to end.

mod common;

use std::time::Duration;

use afz_core::{CacheStatus, FallbackKind, FetchRequest, ResponseSource, StoreName};
use afz_test::tracing::capture_spans;
use afz_test::{get, image, navigate};
use afz_worker::fallback::UNAVAILABLE_BODY;
use afz_worker::{FetchOutcome, StrategyKind};
use common::{HOME, OFFLINE_HTML, PLACEHOLDER_SVG, STYLESHEET, Site};
use http::{Method, StatusCode, header};
use pretty_assertions::assert_eq;
use url::Url;

const ABOUT: &str = "https://afz.org/about.html";
const LOGO: &str = "https://afz.org/images/logo.png";
const NEWS: &str = "https://afz.org/api/news";
const WIDGET: &str = "https://cdn.example.net/widget";

fn strategy(outcome: &FetchOutcome) -> StrategyKind {
    match outcome {
        FetchOutcome::Respond { strategy, .. } => *strategy,
        FetchOutcome::Bypass => panic!("request was bypassed"),
    }
}

#[tokio::test]
async fn test_cache_first_hit_never_touches_network() {
    let site = Site::activated("v2").await;
    let installs = site.network.calls(STYLESHEET);

    for _ in 0..3 {
        let outcome = site.worker.fetch(get(STYLESHEET)).await;
        assert_eq!(strategy(&outcome), StrategyKind::CacheFirst);
        let context = outcome.context().unwrap();
        assert_eq!(context.status, CacheStatus::Hit);
        assert_eq!(
            context.source,
            ResponseSource::Store(StoreName::from("afz-cache-v2"))
        );
    }

    assert_eq!(site.network.calls(STYLESHEET), installs);
}

#[tokio::test]
async fn test_cache_first_miss_is_kept_for_next_time() {
    let site = Site::activated("v2").await;
    site.network.respond(LOGO, 200, "png-bytes");

    let first = site.worker.fetch(get(LOGO)).await;
    let second = site.worker.fetch(get(LOGO)).await;

    assert_eq!(first.context().unwrap().status, CacheStatus::Miss);
    assert_eq!(second.context().unwrap().status, CacheStatus::Hit);
    assert_eq!(second.response().unwrap().body_text(), "png-bytes");
    assert_eq!(site.network.calls(LOGO), 1);
}

#[tokio::test]
async fn test_network_first_writes_through_and_serves_offline() {
    let site = Site::activated("v2").await;
    site.network.respond(NEWS, 200, r#"[{"title":"Fundraiser"}]"#);

    let online = site.worker.fetch(get(NEWS)).await;
    assert_eq!(strategy(&online), StrategyKind::NetworkFirst);
    assert_eq!(online.context().unwrap().source, ResponseSource::Network);

    let stored = site.stored("afz-runtime-v2", NEWS).await.unwrap();
    assert_eq!(stored.body_text(), r#"[{"title":"Fundraiser"}]"#);

    site.network.set_offline(true);
    let offline = site.worker.fetch(get(NEWS)).await;
    assert_eq!(offline.context().unwrap().status, CacheStatus::Hit);
    assert_eq!(
        offline.response().unwrap().body_text(),
        r#"[{"title":"Fundraiser"}]"#
    );
}

#[tokio::test]
async fn test_error_responses_reach_the_page_but_are_never_stored() {
    let site = Site::activated("v2").await;
    let cases = [
        ("https://afz.org/images/missing.png", 404),
        ("https://afz.org/api/broken", 500),
        ("https://afz.org/projects/", 404),
        ("https://cdn.example.net/gone.json", 500),
        ("https://afz.org/old-page", 301),
    ];
    for (url, status) in cases {
        site.network.respond(url, status, "error page");
    }

    for (url, status) in cases {
        let outcome = site.worker.fetch(get(url)).await;
        let response = outcome.response().unwrap();
        assert_eq!(response.status().as_u16(), status, "{url}");
        assert_eq!(response.body_text(), "error page");

        assert!(site.stored("afz-runtime-v2", url).await.is_none(), "{url}");
        assert!(site.stored("afz-cache-v2", url).await.is_none(), "{url}");
    }
}

#[tokio::test]
async fn test_stale_while_revalidate_answers_before_the_refresh() {
    let site = Site::activated("v2").await;
    site.network.respond_once(WIDGET, 200, "v1");

    let warmup = site.worker.fetch(get(WIDGET)).await;
    assert_eq!(strategy(&warmup), StrategyKind::StaleWhileRevalidate);
    assert_eq!(warmup.context().unwrap().status, CacheStatus::Miss);

    site.network
        .respond(WIDGET, 200, "v2")
        .delay(WIDGET, Duration::from_millis(300));

    let started = tokio::time::Instant::now();
    let stale = site.worker.fetch(get(WIDGET)).await;
    assert!(started.elapsed() < Duration::from_millis(300));
    assert_eq!(stale.context().unwrap().status, CacheStatus::Stale);
    assert_eq!(stale.response().unwrap().body_text(), "v1");

    site.worker.offload().wait_all().await;
    let refreshed = site.stored("afz-runtime-v2", WIDGET).await.unwrap();
    assert_eq!(refreshed.body_text(), "v2");
    assert_eq!(site.network.calls(WIDGET), 2);
}

#[tokio::test]
async fn test_failed_revalidation_keeps_the_stored_copy() {
    let site = Site::activated("v2").await;
    site.network.respond_once(WIDGET, 200, "v1");
    site.worker.fetch(get(WIDGET)).await;

    site.network.fail(WIDGET);
    let stale = site.worker.fetch(get(WIDGET)).await;
    site.worker.offload().wait_all().await;

    assert_eq!(stale.response().unwrap().body_text(), "v1");
    let stored = site.stored("afz-runtime-v2", WIDGET).await.unwrap();
    assert_eq!(stored.body_text(), "v1");
}

#[tokio::test]
async fn test_offline_navigation_gets_the_offline_page() {
    let site = Site::activated("v2").await;
    site.network.set_offline(true);

    let outcome = site.worker.fetch(navigate(ABOUT)).await;

    let response = outcome.response().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body_text(), OFFLINE_HTML);
    assert_eq!(
        outcome.context().unwrap().source,
        ResponseSource::Fallback(FallbackKind::OfflinePage)
    );
}

#[tokio::test]
async fn test_offline_navigation_prefers_a_stored_copy() {
    let site = Site::activated("v2").await;
    site.network.set_offline(true);

    let outcome = site.worker.fetch(navigate(HOME)).await;

    assert_eq!(outcome.response().unwrap().body_text(), "<h1>Home</h1>");
    assert!(outcome.context().unwrap().from_store());
}

#[tokio::test]
async fn test_offline_image_gets_the_placeholder() {
    let site = Site::activated("v2").await;
    site.network.set_offline(true);

    let outcome = site.worker.fetch(image(LOGO)).await;

    assert_eq!(outcome.response().unwrap().body_text(), PLACEHOLDER_SVG);
    assert_eq!(
        outcome.context().unwrap().source,
        ResponseSource::Fallback(FallbackKind::PlaceholderImage)
    );
}

#[tokio::test]
async fn test_offline_api_call_gets_plain_503() {
    let site = Site::activated("v2").await;
    site.network.set_offline(true);

    let outcome = site.worker.fetch(get(NEWS)).await;

    let response = outcome.response().unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body_text(), UNAVAILABLE_BODY);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain"
    );
    assert_eq!(
        outcome.context().unwrap().source,
        ResponseSource::Fallback(FallbackKind::Unavailable)
    );
}

#[tokio::test]
async fn test_non_get_and_non_http_requests_are_bypassed() {
    let site = Site::activated("v2").await;
    let calls = site.network.total_calls();

    let post = FetchRequest::new(Method::POST, Url::parse(NEWS).unwrap());
    let extension = FetchRequest::new(
        Method::GET,
        Url::parse("chrome-extension://abcdef/content.js").unwrap(),
    );

    assert!(matches!(site.worker.fetch(post).await, FetchOutcome::Bypass));
    assert!(matches!(
        site.worker.fetch(extension).await,
        FetchOutcome::Bypass
    ));
    assert_eq!(site.network.total_calls(), calls);
}

#[tokio::test]
async fn test_concurrent_misses_both_reach_the_network() {
    let site = Site::activated("v2").await;
    site.network
        .respond(LOGO, 200, "png-bytes")
        .delay(LOGO, Duration::from_millis(50));

    let (a, b) = tokio::join!(site.worker.fetch(get(LOGO)), site.worker.fetch(get(LOGO)));

    assert_eq!(a.response().unwrap().body_text(), "png-bytes");
    assert_eq!(b.response().unwrap().body_text(), "png-bytes");
    assert_eq!(site.network.calls(LOGO), 2);
    assert!(site.stored("afz-runtime-v2", LOGO).await.is_some());
}

#[tokio::test]
async fn test_fetch_span_records_route_and_source() {
    let site = Site::activated("v2").await;

    let (_, spans) = capture_spans(site.worker.fetch(get(STYLESHEET))).await;

    assert_eq!(spans.strategies(), vec!["cache_first"]);
    spans.assert_span_sequence(&["afz.fetch", "strategy.cache_first"]);
    assert_eq!(
        spans.get_field("afz.fetch", "strategy").as_deref(),
        Some("cache_first")
    );
    assert_eq!(
        spans.get_field("afz.fetch", "cache.status").as_deref(),
        Some("hit")
    );
    assert_eq!(
        spans.get_field("afz.fetch", "source").as_deref(),
        Some("afz-cache-v2")
    );
}

#[tokio::test]
async fn test_fallback_is_visible_in_fetch_span() {
    let site = Site::activated("v2").await;
    site.network.set_offline(true);

    let (_, spans) = capture_spans(site.worker.fetch(get(NEWS))).await;

    assert_eq!(spans.fetches().len(), 1);
    assert_eq!(
        spans.get_field("afz.fetch", "source").as_deref(),
        Some("unavailable")
    );
}
