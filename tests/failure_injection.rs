//! Failure injection tests for the shadowing proxy.

use std::time::{Duration, Instant};

use axum::http::StatusCode;
use shadow_proxy::store::MemoryCookieStore;

mod common;

#[tokio::test]
async fn test_unreachable_staging_is_invisible_to_client() {
    let production = common::start_backend("Prod", vec![]).await;
    let staging_addr = common::unused_addr();
    let mut proxy = common::start_proxy(
        &production.url(),
        &format!("http://{}", staging_addr),
        MemoryCookieStore::new("shadow"),
    )
    .await;

    let res = common::client()
        .get(proxy.url("/"))
        .header("cookie", "id=bob")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "Prod");

    proxy.dispatcher.wait_idle().await;
    assert!(proxy.exchanges.try_recv().is_err());

    proxy.stop().await;
}

#[tokio::test]
async fn test_unreachable_production_returns_bad_gateway() {
    let production_addr = common::unused_addr();
    let staging = common::start_backend("Staging", vec![]).await;
    let mut proxy = common::start_proxy(
        &format!("http://{}", production_addr),
        &staging.url(),
        MemoryCookieStore::new("shadow"),
    )
    .await;

    let res = common::client().get(proxy.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(res.text().await.unwrap(), "Upstream request failed");

    // Staging is still replayed against the error the client saw.
    let exchange = proxy.next_exchange().await;
    assert_eq!(exchange.production_response.status, 502);
    assert_eq!(exchange.staging_response.body, "Staging");
    assert_eq!(staging.seen().len(), 1);

    proxy.stop().await;
}

#[tokio::test]
async fn test_slow_staging_does_not_delay_client() {
    let production = common::start_backend("Prod", vec![]).await;
    let staging =
        common::start_backend_with_delay("Staging", vec![], Duration::from_millis(1_500)).await;
    let mut proxy = common::start_proxy(
        &production.url(),
        &staging.url(),
        MemoryCookieStore::new("shadow"),
    )
    .await;

    let start = Instant::now();
    let res = common::client().get(proxy.url("/")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "Prod");
    assert!(start.elapsed() < Duration::from_millis(1_000));

    let exchange = proxy.next_exchange().await;
    assert_eq!(exchange.staging_response.body, "Staging");

    proxy.stop().await;
}

#[tokio::test]
async fn test_oversized_body_is_rejected_before_dispatch() {
    let production = common::start_backend("Prod", vec![]).await;
    let staging = common::start_backend("Staging", vec![]).await;
    let proxy = common::start_proxy(
        &production.url(),
        &staging.url(),
        MemoryCookieStore::new("shadow"),
    )
    .await;

    let res = common::client()
        .post(proxy.url("/upload"))
        .body(vec![b'x'; 4096])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);

    proxy.dispatcher.wait_idle().await;
    assert!(production.seen().is_empty());
    assert!(staging.seen().is_empty());

    proxy.stop().await;
}

#[tokio::test]
async fn test_large_production_response_is_returned_in_full() {
    // Four times the inbound body limit the test proxy runs with.
    let large: &'static str = Box::leak("p".repeat(4096).into_boxed_str());
    let production = common::start_backend(large, vec![]).await;
    let staging = common::start_backend("Staging", vec![]).await;
    let mut proxy = common::start_proxy(
        &production.url(),
        &staging.url(),
        MemoryCookieStore::new("shadow"),
    )
    .await;

    let res = common::client().get(proxy.url("/report")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap().len(), 4096);

    let exchange = proxy.next_exchange().await;
    assert_eq!(exchange.production_response.body.len(), 4096);
    assert_eq!(exchange.staging_response.body, "Staging");

    proxy.stop().await;
}
