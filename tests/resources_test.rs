//! Catalog and stream request handling through the full router.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use common::*;
use serde::Deserialize;
use stremio_addon::{
    AddonBuilder, BehaviorHints, HandlerError, Options, StreamItem, UserData, UserDataEncoding,
    UserDataFormat,
};

#[tokio::test]
async fn test_stream_envelope() {
    let app = blender_builder().build().unwrap().router();

    let response = get(&app, "/stream/movie/tt1254207.json").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/json");
    assert!(response.headers().get("cache-control").is_none());
    assert!(response.headers().get("etag").is_none());

    let body = body_json(response.into_body()).await;
    let streams: Vec<StreamItem> = serde_json::from_value(body["streams"].clone()).unwrap();
    assert_eq!(streams, bbb_streams());
}

#[tokio::test]
async fn test_catalog_envelope() {
    let app = blender_builder().build().unwrap().router();

    let response = get(&app, "/catalog/movie/blender.json").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response.into_body()).await;
    let metas = body["metas"].as_array().unwrap();
    assert_eq!(metas.len(), 1);
    assert_eq!(metas[0]["id"], BIG_BUCK_BUNNY);
    assert_eq!(metas[0]["type"], "movie");
}

#[tokio::test]
async fn test_empty_result_is_empty_array() {
    let app = AddonBuilder::<serde_json::Value>::new(manifest())
        .stream("movie", |_ctx, _id, _ud| async { Ok(vec![]) })
        .build()
        .unwrap()
        .router();

    let response = get(&app, "/stream/movie/tt1254207.json").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response.into_body()).await, r#"{"streams":[]}"#);
}

#[tokio::test]
async fn test_unhandled_type_never_reaches_handler() {
    let called = Arc::new(AtomicBool::new(false));
    let flag = called.clone();
    let app = AddonBuilder::<serde_json::Value>::new(manifest())
        .stream("movie", move |_ctx, _id, _ud| {
            flag.store(true, Ordering::SeqCst);
            async { Ok(vec![]) }
        })
        .build()
        .unwrap()
        .router();

    let response = get(&app, "/stream/series/tt0903747%3A1%3A1.json").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_to_string(response.into_body()).await.is_empty());
    assert!(!called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_handler_errors_map_to_status() {
    let app = AddonBuilder::<serde_json::Value>::new(manifest())
        .stream("movie", |_ctx, id, _ud| async move {
            match id.as_str() {
                "tt0000001" => Err(HandlerError::NotFound),
                "tt0000002" => Err(HandlerError::BadRequest),
                _ => Err(HandlerError::other(std::io::Error::other("db down"))),
            }
        })
        .build()
        .unwrap()
        .router();

    let cases = [
        ("/stream/movie/tt0000001.json", StatusCode::NOT_FOUND),
        ("/stream/movie/tt0000002.json", StatusCode::BAD_REQUEST),
        ("/stream/movie/tt0000003.json", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (uri, expected) in cases {
        let response = get(&app, uri).await;
        assert_eq!(response.status(), expected, "{uri}");
        // Internal error text never leaks to the client
        assert!(body_to_string(response.into_body()).await.is_empty(), "{uri}");
    }
}

#[tokio::test]
async fn test_missing_json_suffix_is_not_found() {
    let app = blender_builder().build().unwrap().router();

    let response = get(&app, "/stream/movie/tt1254207").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_catalog_without_handlers_is_not_routed() {
    let app = AddonBuilder::<serde_json::Value>::new(manifest())
        .stream("movie", |_ctx, _id, _ud| async { Ok(vec![]) })
        .build()
        .unwrap()
        .router();

    let response = get(&app, "/catalog/movie/blender.json").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_episode_id_is_unescaped() {
    let app = AddonBuilder::<serde_json::Value>::new(manifest())
        .stream("series", |_ctx, id, _ud| async move {
            assert_eq!(id, "tt0903747:1:2");
            Ok(vec![StreamItem::youtube("aqz-KE-bpKQ")])
        })
        .build()
        .unwrap()
        .router();

    let response = get(&app, "/stream/series/tt0903747%3A1%3A2.json").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response.into_body()).await;
    assert_eq!(body["streams"][0]["ytId"], "aqz-KE-bpKQ");
}

#[tokio::test]
async fn test_stream_id_pattern() {
    let options = Options {
        stream_id_pattern: Some(r"^tt\d{7,8}$".into()),
        ..options()
    };
    let app = blender_builder().options(options).build().unwrap().router();

    let response = get(&app, "/stream/movie/tt1254207.json").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&app, "/stream/movie/kitsu%3A123.json").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Catalog IDs aren't subject to the pattern
    let response = get(&app, "/catalog/movie/blender.json").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_required_configuration() {
    let mut manifest = manifest();
    manifest.behavior_hints = BehaviorHints {
        configurable: true,
        configuration_required: true,
        ..Default::default()
    };
    let app = AddonBuilder::<serde_json::Value>::new(manifest)
        .stream("movie", |_ctx, _id, user_data| async move {
            assert!(!user_data.is_absent());
            Ok(bbb_streams())
        })
        .build()
        .unwrap()
        .router();

    let response = get(&app, "/stream/movie/tt1254207.json").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(&app, "/abc/stream/movie/tt1254207.json").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_opaque_user_data() {
    let app = AddonBuilder::<serde_json::Value>::new(manifest())
        .stream("movie", |ctx, _id, user_data| async move {
            assert!(ctx.flags().configured);
            assert!(ctx.flags().stream);
            assert_eq!(user_data, UserData::Opaque("some token".to_string()));
            Ok(vec![])
        })
        .build()
        .unwrap()
        .router();

    let response = get(&app, "/some%20token/stream/movie/tt1254207.json").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Customer {
    user_id: String,
    preferred_stream_type: String,
}

fn customer_app(encoding: UserDataEncoding) -> axum::Router {
    let options = Options {
        user_data_encoding: encoding,
        ..options()
    };
    AddonBuilder::<Customer>::new(manifest())
        .options(options)
        .user_data(UserDataFormat::json())
        .stream("movie", |_ctx, _id, user_data| async move {
            let Some(customer) = user_data.into_typed() else {
                return Err(HandlerError::BadRequest);
            };
            let streams = bbb_streams();
            Ok(match customer.preferred_stream_type.as_str() {
                "torrent" => vec![streams[0].clone()],
                _ => streams,
            })
        })
        .build()
        .unwrap()
        .router()
}

#[tokio::test]
async fn test_typed_user_data_base64() {
    let app = customer_app(UserDataEncoding::Base64Url);
    let customer = Customer {
        user_id: "123".into(),
        preferred_stream_type: "torrent".into(),
    };
    let token = UserDataEncoding::Base64Url.encode(&customer).unwrap();

    let response = get(&app, &format!("/{token}/stream/movie/tt1254207.json")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response.into_body()).await;
    assert_eq!(body["streams"].as_array().unwrap().len(), 1);

    // Without user data the handler sees `UserData::Absent`
    let response = get(&app, "/stream/movie/tt1254207.json").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_typed_user_data_url_encoded() {
    let app = customer_app(UserDataEncoding::Url);
    let customer = Customer {
        user_id: "123".into(),
        preferred_stream_type: "http".into(),
    };
    let token = UserDataEncoding::Url.encode(&customer).unwrap();

    let response = get(&app, &format!("/{token}/stream/movie/tt1254207.json")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response.into_body()).await;
    assert_eq!(body["streams"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_undecodable_user_data_is_bad_request() {
    let app = customer_app(UserDataEncoding::Base64Url);

    // Valid base64 of "not json"
    let response = get(&app, "/bm90IGpzb24/stream/movie/tt1254207.json").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(&app, "/!!!/stream/movie/tt1254207.json").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
