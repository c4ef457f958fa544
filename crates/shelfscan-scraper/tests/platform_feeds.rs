//! Integration tests for platform detection and the Shopify bulk feed.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shelfscan_scraper::feeds::{self, shopify, Platform};
use shelfscan_scraper::{FetchSettings, HttpFetcher, ScraperError};

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(&FetchSettings {
        timeout_secs: 5,
        user_agent: "shelfscan-test/0.1".to_string(),
        max_retries: 0,
        backoff_base_ms: 0,
        verify_tls: true,
        settle: Duration::ZERO,
    })
    .expect("failed to build test HttpFetcher")
}

fn products(ids: &[i64]) -> serde_json::Value {
    let products: Vec<_> = ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "title": format!("Product {id}"),
                "handle": format!("product-{id}"),
                "body_html": "<p>Nice</p>",
                "images": [{"src": format!("https://cdn.test/{id}.jpg")}],
                "variants": [{"sku": format!("SKU-{id:04}"), "barcode": null}]
            })
        })
        .collect();
    json!({ "products": products })
}

#[tokio::test]
async fn follows_link_cursors() {
    let server = MockServer::start().await;
    let next_link = format!(
        "<{}/products.json?limit=250&page_info=cursor2>; rel=\"next\"",
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param_is_missing("page_info"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(products(&[1]))
                .insert_header("Link", next_link.as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param("page_info", "cursor2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(products(&[2])))
        .mount(&server)
        .await;

    let all = shopify::fetch_all(&fetcher(), &server.uri(), Duration::ZERO)
        .await
        .expect("feed");
    let ids: Vec<i64> = all.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn falls_back_to_page_numbers_until_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(products(&[1, 2])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(products(&[3])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"products": []})))
        .mount(&server)
        .await;

    let entries = shopify::fetch_catalog(&fetcher(), &server.uri(), Duration::ZERO)
        .await
        .expect("catalog");
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].title, "Product 1");
    assert_eq!(
        entries[0].product_url,
        format!("{}/products/product-1", server.uri())
    );
    assert_eq!(entries[0].description, "Nice");
    assert!(entries[2].barcodes.contains("SKU-0003"));
}

#[tokio::test]
async fn failing_page_fails_the_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(products(&[1])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = shopify::fetch_all(&fetcher(), &server.uri(), Duration::ZERO)
        .await
        .unwrap_err();
    assert!(
        matches!(err, ScraperError::UnexpectedStatus { status: 503, .. }),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn html_answer_is_not_a_shopify_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>home</html>"))
        .mount(&server)
        .await;

    assert!(!shopify::probe(&fetcher(), &server.uri()).await);
}

#[tokio::test]
async fn detects_shopify_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(products(&[1])))
        .mount(&server)
        .await;

    assert_eq!(
        feeds::detect_platform(&fetcher(), &server.uri()).await,
        Some(Platform::Shopify)
    );
}

#[tokio::test]
async fn detects_woocommerce_store_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wc/store/v1/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "Wooden Train", "permalink": "https://s/product/train/", "sku": "WT-1001"}
        ])))
        .mount(&server)
        .await;

    assert_eq!(
        feeds::detect_platform(&fetcher(), &server.uri()).await,
        Some(Platform::WooCommerce)
    );
}

#[tokio::test]
async fn no_feed_detected_on_plain_site() {
    let server = MockServer::start().await;
    assert_eq!(feeds::detect_platform(&fetcher(), &server.uri()).await, None);
}
