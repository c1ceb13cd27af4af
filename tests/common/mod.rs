//! Shared test helpers for integration tests.
//!
//! Addons are driven in-process through [`tower::ServiceExt::oneshot`], so no
//! socket is bound.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use stremio_addon::{
    AddonBuilder, HandlerError, Manifest, Meta, MetaFetcher, MetaPreviewItem, Options,
    ResourceItem, StreamItem,
};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub const BIG_BUCK_BUNNY: &str = "tt1254207";

pub fn manifest() -> Manifest {
    Manifest {
        id: "com.example.blender-streams".into(),
        name: "Blender movie streams".into(),
        description: "Stream addon for free movies that were made with Blender".into(),
        version: "0.1.0".into(),
        resource_items: Some(vec![ResourceItem {
            name: "stream".into(),
            types: Some(vec!["movie".into()]),
            id_prefixes: Some(vec!["tt".into()]),
        }]),
        types: Some(vec!["movie".into()]),
        catalogs: Some(vec![]),
        id_prefixes: Some(vec!["tt".into()]),
        ..Default::default()
    }
}

/// Default options; request logging stays on so it's exercised too.
pub fn options() -> Options {
    Options::default()
}

pub fn bbb_streams() -> Vec<StreamItem> {
    vec![
        StreamItem::torrent("dd8255ecdc7ca55fb0bbf81323d87062db1f6d1c", Some(1))
            .with_title("1080p (torrent)"),
        StreamItem::url(
            "https://ftp.halifax.rwth-aachen.de/blender/demo/movies/BBB/bbb_sunflower_1080p_30fps_normal.mp4",
        )
        .with_title("1080p (HTTP stream)"),
    ]
}

/// Movie streams for Big Buck Bunny, 404 for everything else.
pub fn blender_builder() -> AddonBuilder<serde_json::Value> {
    AddonBuilder::new(manifest())
        .options(options())
        .stream("movie", |_ctx, id, _user_data| async move {
            if id == BIG_BUCK_BUNNY {
                Ok(bbb_streams())
            } else {
                Err(HandlerError::NotFound)
            }
        })
        .catalog("movie", |_ctx, id, _user_data| async move {
            if id != "blender" {
                return Err(HandlerError::NotFound);
            }
            Ok(vec![MetaPreviewItem {
                id: BIG_BUCK_BUNNY.into(),
                kind: "movie".into(),
                name: "Big Buck Bunny".into(),
                poster: "https://images.metahub.space/poster/medium/tt1254207/img".into(),
                ..Default::default()
            }])
        })
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

/// Helper to get response body as string
pub async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(body: Body) -> serde_json::Value {
    serde_json::from_str(&body_to_string(body).await).unwrap()
}

/// Meta fetcher that answers from memory after an optional delay.
pub struct FakeFetcher {
    pub delay: Duration,
    /// Set once a lookup has completed.
    pub done: Arc<AtomicBool>,
}

impl FakeFetcher {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            done: Arc::new(AtomicBool::new(false)),
        }
    }

    async fn answer(&self, meta: Meta) -> anyhow::Result<Meta> {
        tokio::time::sleep(self.delay).await;
        self.done.store(true, Ordering::SeqCst);
        Ok(meta)
    }
}

#[async_trait]
impl MetaFetcher for FakeFetcher {
    async fn get_movie(&self, _cancel: &CancellationToken, imdb_id: &str) -> anyhow::Result<Meta> {
        if imdb_id != BIG_BUCK_BUNNY {
            anyhow::bail!("Unknown movie {imdb_id}");
        }
        self.answer(Meta {
            id: imdb_id.into(),
            kind: "movie".into(),
            name: "Big Buck Bunny".into(),
            release_info: Some("2008".into()),
            ..Default::default()
        })
        .await
    }

    async fn get_tv_show(
        &self,
        _cancel: &CancellationToken,
        imdb_id: &str,
        season: u32,
        episode: u32,
    ) -> anyhow::Result<Meta> {
        self.answer(Meta {
            id: format!("{imdb_id}:{season}:{episode}"),
            kind: "series".into(),
            name: "Some show".into(),
            ..Default::default()
        })
        .await
    }
}
