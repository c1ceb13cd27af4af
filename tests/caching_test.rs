//! Cache-Control, ETag and conditional request tests.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::*;
use stremio_addon::{CachePolicy, Options};

fn cached_app(etag: bool) -> axum::Router {
    let options = Options {
        stream_cache: CachePolicy {
            max_age_secs: 3600,
            public: true,
            etag,
        },
        catalog_cache: CachePolicy {
            max_age_secs: 60,
            public: false,
            etag: false,
        },
        ..options()
    };
    blender_builder().options(options).build().unwrap().router()
}

async fn conditional_get(app: &axum::Router, uri: &str, if_none_match: &str) -> axum::http::Response<Body> {
    send(
        app,
        Request::get(uri)
            .header("if-none-match", if_none_match)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

#[tokio::test]
async fn test_cache_control_per_family() {
    let app = cached_app(false);

    let response = get(&app, "/stream/movie/tt1254207.json").await;
    assert_eq!(response.headers()["cache-control"], "max-age=3600, public");
    assert!(response.headers().get("etag").is_none());

    let response = get(&app, "/catalog/movie/blender.json").await;
    assert_eq!(response.headers()["cache-control"], "max-age=60, private");
}

#[tokio::test]
async fn test_errors_are_not_cached() {
    let app = cached_app(true);

    let response = get(&app, "/stream/movie/tt0000001.json").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().get("cache-control").is_none());
    assert!(response.headers().get("etag").is_none());
}

#[tokio::test]
async fn test_etag_revalidation() {
    let app = cached_app(true);
    let uri = "/stream/movie/tt1254207.json";

    let first = get(&app, uri).await;
    assert_eq!(first.status(), StatusCode::OK);
    let etag = first.headers()["etag"].to_str().unwrap().to_string();
    assert!(etag.starts_with('"') && etag.ends_with('"'));
    let cache_control = first.headers()["cache-control"].clone();

    // Same body, same tag
    let again = get(&app, uri).await;
    assert_eq!(again.headers()["etag"], etag.as_str());

    let revalidated = conditional_get(&app, uri, &etag).await;
    assert_eq!(revalidated.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(revalidated.headers()["etag"], etag.as_str());
    assert_eq!(revalidated.headers()["cache-control"], cache_control);
    assert!(body_to_string(revalidated.into_body()).await.is_empty());

    let stale = conditional_get(&app, uri, "\"0000000000000000\"").await;
    assert_eq!(stale.status(), StatusCode::OK);
    assert!(!body_to_string(stale.into_body()).await.is_empty());
}

#[tokio::test]
async fn test_etag_wildcard_and_lists() {
    let app = cached_app(true);
    let uri = "/stream/movie/tt1254207.json";

    let response = conditional_get(&app, uri, "*").await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);

    let etag = get(&app, uri).await.headers()["etag"]
        .to_str()
        .unwrap()
        .to_string();
    let list = format!("\"abc\", W/{etag}");
    let response = conditional_get(&app, uri, &list).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn test_etag_disabled_ignores_if_none_match() {
    let app = cached_app(false);

    let response = conditional_get(&app, "/stream/movie/tt1254207.json", "*").await;
    assert_eq!(response.status(), StatusCode::OK);
}
