//! Stremio-Addon - SDK for building Stremio addons
//!
//! Exposes catalog and stream handlers as an HTTP server that speaks the
//! Stremio addon protocol:
//!
//! - **Manifest**: served at `/manifest.json` and `/{userData}/manifest.json`
//! - **Catalogs**: `/catalog/{type}/{id}.json`, answered with `{"metas": [...]}`
//! - **Streams**: `/stream/{type}/{id}.json`, answered with `{"streams": [...]}`
//! - **User data**: per-user configuration carried in the URL
//! - **Caching**: `Cache-Control`, `ETag` and `304 Not Modified`
//! - **Middleware**: CORS, request logging, metrics, meta lookups
//!
//! # Examples
//!
//! ```no_run
//! use stremio_addon::{AddonBuilder, HandlerError, Manifest, StreamItem};
//!
//! # async fn example() -> stremio_addon::Result<()> {
//! let manifest = Manifest {
//!     id: "com.example.blender-streams".into(),
//!     name: "Blender movie streams".into(),
//!     description: "Stream addon for free movies that were made with Blender".into(),
//!     version: "0.1.0".into(),
//!     ..Default::default()
//! };
//!
//! let addon = AddonBuilder::<serde_json::Value>::new(manifest)
//!     .stream("movie", |_ctx, id, _user_data| async move {
//!         match id.as_str() {
//!             "tt1254207" => Ok(vec![StreamItem::url(
//!                 "http://distribution.bbb3d.renderfarming.net/video/mp4/bbb_sunflower_1080p_30fps_normal.mp4",
//!             )]),
//!             _ => Err(HandlerError::NotFound),
//!         }
//!     })
//!     .build()?;
//!
//! addon.run().await
//! # }
//! ```

pub mod addon;
pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod meta;
pub mod server;
pub mod types;
pub mod user_data;

pub use addon::{
    Addon, AddonBuilder, AddonUserData, CatalogHandler, ManifestCallback, RequestContext,
    RequestFlags, StreamHandler,
};
pub use config::{CachePolicy, LogEncoding, Options};
pub use error::{Error, HandlerError, Result};
pub use manifest::{BehaviorHints, CatalogItem, ExtraItem, Manifest, ResourceItem};
pub use meta::{Meta, MetaFetcher};
pub use types::{MetaItem, MetaLinkItem, MetaPreviewItem, StreamItem, VideoItem};
pub use user_data::{BadUserData, UserData, UserDataCodec, UserDataEncoding, UserDataFormat};
