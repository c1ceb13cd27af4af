//! HTTP server.
//!
//! Request flow, outermost first: CORS, tracing, metrics, request logging,
//! request timeout, custom middleware, then per route the guard and the meta
//! lookup (stream routes only) before the resource handler runs.

pub(crate) mod caching;
pub(crate) mod dispatch;
pub mod guard;
pub(crate) mod manifest;
pub mod middleware;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::header::{self, HeaderValue};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{middleware as axum_middleware, Router};
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::addon::{
    AddonUserData, CustomEndpoint, CustomMiddleware, HandlerTable, ManifestBodies,
    ManifestCallback,
};
use crate::config::{CachePolicy, Options};
use crate::error::Result;
use crate::manifest::Manifest;
use crate::meta::MetaFetcher;
use crate::types::{MetaPreviewItem, StreamItem};
use crate::user_data::UserDataCodec;

use self::guard::GuardConfig;
use self::middleware::logging::LogConfig;
use self::middleware::meta::MetaConfig;

/// The two resource families served through the dispatch pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Catalog,
    Stream,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Catalog => "catalog",
            Resource::Stream => "stream",
        }
    }

    /// Key of the JSON array in the response envelope.
    pub(crate) fn envelope_key(&self) -> &'static str {
        match self {
            Resource::Catalog => "metas",
            Resource::Stream => "streams",
        }
    }
}

/// Handlers and caching policy of one resource family.
pub(crate) struct Family<T, U> {
    pub(crate) resource: Resource,
    pub(crate) handlers: HandlerTable<T, U>,
    pub(crate) cache: CachePolicy,
    pub(crate) cache_control: Option<HeaderValue>,
}

impl<T, U> Family<T, U> {
    pub(crate) fn new(resource: Resource, handlers: HandlerTable<T, U>, cache: CachePolicy) -> Self {
        let cache_control = cache
            .header_value()
            .and_then(|v| HeaderValue::from_str(&v).ok());
        Self {
            resource,
            handlers,
            cache,
            cache_control,
        }
    }

    pub(crate) fn media_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

/// Immutable state shared by all requests.
pub(crate) struct AddonState<U> {
    pub(crate) manifest: Manifest,
    pub(crate) manifest_bodies: Option<ManifestBodies>,
    pub(crate) manifest_callback: Option<ManifestCallback<U>>,
    pub(crate) catalogs: Family<MetaPreviewItem, U>,
    pub(crate) streams: Family<StreamItem, U>,
    pub(crate) codec: UserDataCodec<U>,
    pub(crate) stream_id: Option<Regex>,
    pub(crate) meta_fetcher: Option<Arc<dyn MetaFetcher>>,
    pub(crate) shutdown: CancellationToken,
    pub(crate) options: Options,
}

pub(crate) fn router<U: AddonUserData>(
    state: Arc<AddonState<U>>,
    custom_middleware: &[CustomMiddleware],
    custom_endpoints: &[CustomEndpoint],
) -> Router {
    let options = state.options.clone();
    let requires_configuration = state.manifest.requires_configuration();

    let mut app = Router::new()
        .route("/manifest.json", get(manifest::manifest::<U>))
        .route("/{user_data}/manifest.json", get(manifest::manifest::<U>));

    if !state.catalogs.handlers.is_empty() {
        let guard = GuardConfig::new(Resource::Catalog, requires_configuration, None);
        app = app.merge(
            Router::new()
                .route("/catalog/{type}/{id}", get(dispatch::catalog::<U>))
                .route("/{user_data}/catalog/{type}/{id}", get(dispatch::catalog::<U>))
                .route_layer(axum_middleware::from_fn_with_state(guard, guard::guard)),
        );
    }

    if !state.streams.handlers.is_empty() {
        let guard = GuardConfig::new(
            Resource::Stream,
            requires_configuration,
            state.stream_id.clone(),
        );
        let mut streams = Router::new()
            .route("/stream/{type}/{id}", get(dispatch::stream::<U>))
            .route("/{user_data}/stream/{type}/{id}", get(dispatch::stream::<U>));
        if let Some(fetcher) = &state.meta_fetcher {
            let meta = MetaConfig::new(fetcher.clone(), &options, state.shutdown.clone());
            streams = streams
                .route_layer(axum_middleware::from_fn_with_state(meta, middleware::meta::lookup));
        }
        app = app.merge(
            streams.route_layer(axum_middleware::from_fn_with_state(guard, guard::guard)),
        );
    }

    app = app.route("/health", get(health_check));

    if let Some(url) = options.redirect_url.clone() {
        app = app.route("/", get(move || root_redirect(url.clone())));
    }

    if options.metrics {
        match middleware::metrics::handle() {
            Some(handle) => {
                app = app.route("/metrics", get(move || std::future::ready(handle.render())));
            }
            None => tracing::warn!("Metrics recorder unavailable, not serving /metrics"),
        }
    }

    let mut app = app.with_state(state);

    if let Some(dir) = &options.configure_dir {
        tracing::info!(dir = ?dir, "Serving configure page");
        app = app
            .nest_service("/configure", ServeDir::new(dir))
            .nest_service("/{user_data}/configure", ServeDir::new(dir));
    }

    for endpoint in custom_endpoints {
        tracing::debug!(method = %endpoint.method, path = %endpoint.path, "Adding custom endpoint");
        app = app.route(&endpoint.path, endpoint.route.clone());
    }

    // First registered runs first.
    for mw in custom_middleware.iter().rev() {
        app = app.layer(axum_middleware::from_fn_with_state(
            mw.clone(),
            middleware::custom::run,
        ));
    }

    app = app.layer(TimeoutLayer::new(options.request_timeout()));

    if !options.disable_request_logging {
        app = app.layer(axum_middleware::from_fn_with_state(
            LogConfig::from(&options),
            middleware::logging::log_requests,
        ));
    }

    if options.metrics {
        app = app.layer(axum_middleware::from_fn(middleware::metrics::track));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(middleware::cors::layer())
}

async fn health_check() -> impl IntoResponse {
    "OK"
}

async fn root_redirect(url: String) -> impl IntoResponse {
    tracing::debug!(redirect_url = %url, "Responding with redirect");
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, url)])
}

/// Serve until a shutdown signal, then give in-flight requests the grace
/// period to finish.
pub(crate) async fn serve(app: Router, options: &Options, shutdown: CancellationToken) -> Result<()> {
    let addr = format!("{}:{}", options.bind_addr, options.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Starting server");

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
    .into_future();
    tokio::pin!(server);

    tokio::select! {
        res = &mut server => return Ok(res?),
        _ = shutdown.cancelled() => {}
    }

    let grace = options.shutdown_grace();
    match tokio::time::timeout(grace, server).await {
        Ok(res) => res?,
        Err(_) => tracing::warn!(grace = ?grace, "Requests didn't finish within the grace period"),
    }

    tracing::info!("Finished shutting down server");
    Ok(())
}

/// Wait for SIGINT, SIGTERM or the token, then cancel the token so that
/// in-flight requests observe the shutdown.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down server..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down server..."),
        _ = cancel.cancelled() => tracing::info!("Shutdown requested, shutting down server..."),
    }

    cancel.cancel();
}
