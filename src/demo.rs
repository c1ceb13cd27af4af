//! Example addon: free movies made with Blender.
//!
//! Users configure the addon with a customer record (user ID, token and
//! preferred stream type) which travels Base64URL encoded in the URL path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use stremio_addon::{
    Addon, AddonBuilder, BehaviorHints, CatalogItem, HandlerError, Manifest, MetaPreviewItem,
    Options, RequestContext, ResourceItem, StreamItem, UserData, UserDataCodec, UserDataEncoding,
    UserDataFormat,
};
use tracing::{info, warn};

pub const BIG_BUCK_BUNNY: &str = "tt1254207";
const SINTEL: &str = "tt1727587";
const TEARS_OF_STEEL: &str = "tt2285752";

const BBB_INFO_HASH: &str = "dd8255ecdc7ca55fb0bbf81323d87062db1f6d1c";
const BBB_HTTP_URL: &str =
    "https://ftp.halifax.rwth-aachen.de/blender/demo/movies/BBB/bbb_sunflower_1080p_30fps_normal.mp4";

/// Users who may install the addon.
const ALLOWED_USERS: &[&str] = &["123", "456"];

/// Per-user configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub user_id: String,
    pub token: String,
    /// "http", "torrent" or empty for both
    #[serde(default)]
    pub preferred_stream_type: String,
}

impl Customer {
    fn is_allowed(&self) -> bool {
        ALLOWED_USERS.contains(&self.user_id.as_str())
    }
}

pub fn manifest() -> Manifest {
    Manifest {
        id: "com.example.blender-streams".into(),
        name: "Blender movie streams".into(),
        description: "Stream addon for free movies that were made with Blender".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        resource_items: Some(vec![
            ResourceItem {
                name: "catalog".into(),
                types: Some(vec!["movie".into()]),
                id_prefixes: None,
            },
            ResourceItem {
                name: "stream".into(),
                types: Some(vec!["movie".into()]),
                id_prefixes: Some(vec!["tt".into()]),
            },
        ]),
        types: Some(vec!["movie".into()]),
        catalogs: Some(vec![CatalogItem {
            kind: "movie".into(),
            id: "blender".into(),
            name: "Blender movies".into(),
            extra: None,
        }]),
        id_prefixes: Some(vec!["tt".into()]),
        behavior_hints: BehaviorHints {
            p2p: true,
            configurable: true,
            configuration_required: true,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Build the example addon on top of the given options.
pub fn build(mut options: Options) -> stremio_addon::Result<Addon<Customer>> {
    options.user_data_encoding = UserDataEncoding::Base64Url;
    if options.stream_id_pattern.is_none() {
        options.stream_id_pattern = Some(r"^tt\d{7,8}$".into());
    }

    let installs = Arc::new(AtomicU64::new(0));

    let builder = AddonBuilder::<Customer>::new(manifest())
        .options(options)
        .user_data(UserDataFormat::json())
        .catalog("movie", catalog)
        .stream("movie", stream)
        .manifest_callback(move |_ctx, _manifest, user_data| {
            // Unconfigured manifest requests come from the configuration page
            let Some(customer) = user_data.typed() else {
                return StatusCode::OK;
            };
            if !customer.is_allowed() {
                warn!(user_id = %customer.user_id, "Install attempt by unknown user");
                return StatusCode::UNAUTHORIZED;
            }
            let count = installs.fetch_add(1, Ordering::Relaxed) + 1;
            info!(user_id = %customer.user_id, installs = count, "User installed addon");
            StatusCode::OK
        })
        .endpoint(Method::GET, "/{user_data}/ping", || async { "pong" });

    let codec = builder.codec();
    builder
        .middleware("/{user_data}/stream", move |request, next| {
            authorize(codec.clone(), request, next)
        })
        .build()
}

/// Reject stream requests of users that aren't allowed.
async fn authorize(codec: UserDataCodec<Customer>, request: Request, next: Next) -> Response {
    let token = request
        .uri()
        .path()
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string();

    match codec.decode(&token) {
        Ok(UserData::Typed(customer)) if customer.is_allowed() => next.run(request).await,
        Ok(_) => StatusCode::UNAUTHORIZED.into_response(),
        Err(e) => {
            warn!(error = %e, "Couldn't decode user data");
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}

async fn catalog(
    _ctx: RequestContext,
    id: String,
    _user_data: UserData<Customer>,
) -> Result<Vec<MetaPreviewItem>, HandlerError> {
    if id != "blender" {
        return Err(HandlerError::NotFound);
    }

    Ok([
        (BIG_BUCK_BUNNY, "Big Buck Bunny"),
        (SINTEL, "Sintel"),
        (TEARS_OF_STEEL, "Tears of Steel"),
    ]
    .into_iter()
    .map(|(id, name)| MetaPreviewItem {
        id: id.into(),
        kind: "movie".into(),
        name: name.into(),
        poster: format!("https://images.metahub.space/poster/medium/{id}/img"),
        ..Default::default()
    })
    .collect())
}

async fn stream(
    ctx: RequestContext,
    id: String,
    user_data: UserData<Customer>,
) -> Result<Vec<StreamItem>, HandlerError> {
    // Only Big Buck Bunny has streams
    if id != BIG_BUCK_BUNNY {
        return Err(HandlerError::NotFound);
    }
    let Some(customer) = user_data.into_typed() else {
        return Err(HandlerError::BadRequest);
    };

    match ctx.meta() {
        Some(meta) => info!(user_id = %customer.user_id, media = %meta.display_title(), "User is asking for streams"),
        None => info!(user_id = %customer.user_id, "User is asking for streams"),
    }

    let torrent = StreamItem::torrent(BBB_INFO_HASH, Some(1)).with_title("1080p (torrent)");
    let http = StreamItem::url(BBB_HTTP_URL).with_title("1080p (HTTP stream)");

    Ok(match customer.preferred_stream_type.as_str() {
        "torrent" => vec![torrent],
        "http" => vec![http],
        _ => vec![http, torrent],
    })
}
