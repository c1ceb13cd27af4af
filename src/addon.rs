//! Addon construction.
//!
//! An [`AddonBuilder`] collects the manifest, handlers and options, and
//! [`AddonBuilder::build`] checks them once, before any request is served.
//! The resulting [`Addon`] is immutable: handler tables, the manifest and the
//! pre-serialized manifest bodies are shared read-only by all requests.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::extract::Request;
use axum::handler::Handler as RouteHandler;
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::{on, MethodFilter, MethodRouter};
use axum::Router;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::config::{self, Options};
use crate::error::{Error, HandlerError, Result};
use crate::manifest::Manifest;
use crate::meta::{self, Meta, MetaFetcher};
use crate::server::{self, AddonState, Family, Resource};
use crate::types::{MetaPreviewItem, StreamItem};
use crate::user_data::{UserData, UserDataCodec, UserDataFormat};

pub use crate::server::guard::RequestFlags;

/// Bound for the user data type of an addon.
pub trait AddonUserData: fmt::Debug + Send + Sync + 'static {}

impl<T: fmt::Debug + Send + Sync + 'static> AddonUserData for T {}

/// Per-request context handed to handlers and the manifest callback.
#[derive(Debug, Clone)]
pub struct RequestContext {
    cancel: CancellationToken,
    meta: Option<Meta>,
    flags: RequestFlags,
}

impl RequestContext {
    pub fn new(cancel: CancellationToken, meta: Option<Meta>, flags: RequestFlags) -> Self {
        Self {
            cancel,
            meta,
            flags,
        }
    }

    /// Cancelled when the client goes away or the server shuts down.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Movie / TV show info, only for stream requests with
    /// `put_meta_in_context` and only if the lookup succeeded in time.
    pub fn meta(&self) -> Option<&Meta> {
        self.meta.as_ref()
    }

    pub fn flags(&self) -> RequestFlags {
        self.flags
    }
}

/// Boxed catalog or stream handler.
pub type Handler<T, U> = Arc<
    dyn Fn(RequestContext, String, UserData<U>) -> BoxFuture<'static, std::result::Result<Vec<T>, HandlerError>>
        + Send
        + Sync,
>;

/// Handlers of one resource family, keyed by media type ("movie", "series", ...).
pub type HandlerTable<T, U> = HashMap<String, Handler<T, U>>;

pub type CatalogHandler<U> = Handler<MetaPreviewItem, U>;
pub type StreamHandler<U> = Handler<StreamItem, U>;

/// Gets called for every manifest request.
///
/// Receives a clone of the manifest it may alter freely. A returned status
/// of 400 or above is sent to the client as is, without a body.
pub type ManifestCallback<U> =
    Arc<dyn Fn(&RequestContext, &mut Manifest, &UserData<U>) -> StatusCode + Send + Sync>;

pub(crate) type MiddlewareFn =
    Arc<dyn Fn(Request, Next) -> BoxFuture<'static, Response> + Send + Sync>;

/// Operator middleware attached at a path prefix.
#[derive(Clone)]
pub(crate) struct CustomMiddleware {
    pub(crate) prefix: String,
    pub(crate) handler: MiddlewareFn,
}

#[derive(Clone)]
pub(crate) struct CustomEndpoint {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) route: MethodRouter,
}

/// Paths the addon itself serves; custom endpoints can't take them over.
const RESERVED_PATHS: &[&str] = &[
    "/",
    "/health",
    "/metrics",
    "/manifest.json",
    "/{user_data}/manifest.json",
    "/catalog/{type}/{id}",
    "/{user_data}/catalog/{type}/{id}",
    "/stream/{type}/{id}",
    "/{user_data}/stream/{type}/{id}",
];

/// Builder for an [`Addon`].
pub struct AddonBuilder<U = serde_json::Value> {
    manifest: Manifest,
    options: Options,
    catalogs: HandlerTable<MetaPreviewItem, U>,
    streams: HandlerTable<StreamItem, U>,
    user_data: UserDataFormat<U>,
    manifest_callback: Option<ManifestCallback<U>>,
    meta_fetcher: Option<Arc<dyn MetaFetcher>>,
    middleware: Vec<CustomMiddleware>,
    endpoints: Vec<(Method, String, Box<dyn FnOnce(MethodFilter) -> MethodRouter + Send>)>,
}

impl<U: AddonUserData> AddonBuilder<U> {
    pub fn new(manifest: Manifest) -> Self {
        Self {
            manifest,
            options: Options::default(),
            catalogs: HashMap::new(),
            streams: HashMap::new(),
            user_data: UserDataFormat::Opaque,
            manifest_callback: None,
            meta_fetcher: None,
            middleware: Vec::new(),
            endpoints: Vec::new(),
        }
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Register the catalog handler for a media type.
    ///
    /// The handler receives the catalog ID from the manifest's catalog items.
    pub fn catalog<F, Fut>(mut self, media_type: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RequestContext, String, UserData<U>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Vec<MetaPreviewItem>, HandlerError>>
            + Send
            + 'static,
    {
        self.catalogs.insert(media_type.into(), boxed(handler));
        self
    }

    /// Register the stream handler for a media type.
    ///
    /// The handler receives the media ID, e.g. an IMDb ID for movies or
    /// "tt0903747:1:2" for an episode.
    pub fn stream<F, Fut>(mut self, media_type: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RequestContext, String, UserData<U>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Vec<StreamItem>, HandlerError>> + Send + 'static,
    {
        self.streams.insert(media_type.into(), boxed(handler));
        self
    }

    /// Declare the shape of the user data. Opaque by default.
    pub fn user_data(mut self, format: UserDataFormat<U>) -> Self {
        self.user_data = format;
        self
    }

    /// Codec for the user data format and encoding set so far, e.g. for
    /// custom middleware that inspects user data.
    pub fn codec(&self) -> UserDataCodec<U> {
        UserDataCodec::new(self.user_data.clone(), self.options.user_data_encoding)
    }

    pub fn manifest_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RequestContext, &mut Manifest, &UserData<U>) -> StatusCode + Send + Sync + 'static,
    {
        self.manifest_callback = Some(Arc::new(callback));
        self
    }

    /// Meta fetcher for `put_meta_in_context` and `log_media_name`.
    ///
    /// Without one, a Cinemeta client with an in-memory cache is created.
    pub fn meta_fetcher(mut self, fetcher: Arc<dyn MetaFetcher>) -> Self {
        self.meta_fetcher = Some(fetcher);
        self
    }

    /// Attach middleware to every request whose path starts with `prefix`.
    ///
    /// Segments in braces match any single segment, so
    /// `/{user_data}/stream` covers all configured stream requests.
    pub fn middleware<F, Fut>(mut self, prefix: impl Into<String>, middleware: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.middleware.push(CustomMiddleware {
            prefix: prefix.into(),
            handler: Arc::new(move |req, next| middleware(req, next).boxed()),
        });
        self
    }

    /// Serve an additional endpoint.
    pub fn endpoint<H, T>(mut self, method: Method, path: impl Into<String>, handler: H) -> Self
    where
        H: RouteHandler<T, ()>,
        T: 'static,
    {
        self.endpoints.push((
            method,
            path.into(),
            Box::new(move |filter| on(filter, handler)),
        ));
        self
    }

    /// Check everything and create the addon.
    pub fn build(self) -> Result<Addon<U>> {
        self.manifest.validate()?;
        if self.catalogs.is_empty() && self.streams.is_empty() {
            return Err(Error::NoHandlers);
        }
        config::validate_options(&self.options)?;

        let stream_id = self
            .options
            .stream_id_pattern
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(Regex::new)
            .transpose()?;

        let meta_fetcher = match self.meta_fetcher {
            Some(fetcher) => Some(fetcher),
            None if self.options.needs_meta() => {
                Some(meta::default_fetcher(self.options.meta_timeout())?)
            }
            None => None,
        };

        // Without a callback the manifest never changes per request.
        let manifest_bodies = match self.manifest_callback {
            Some(_) => None,
            None => Some(ManifestBodies {
                plain: Bytes::from(serde_json::to_vec(&self.manifest)?),
                configured: Bytes::from(serde_json::to_vec(&self.manifest.configured())?),
            }),
        };

        let mut endpoints = Vec::with_capacity(self.endpoints.len());
        for (method, path, make_route) in self.endpoints {
            if !path.starts_with('/') || RESERVED_PATHS.contains(&path.as_str()) {
                return Err(Error::Endpoint(format!("{method} {path}")));
            }
            let filter = MethodFilter::try_from(method.clone())
                .map_err(|_| Error::Endpoint(format!("{method} {path}")))?;
            if endpoints
                .iter()
                .any(|e: &CustomEndpoint| e.path == path && e.method == method)
            {
                return Err(Error::Endpoint(format!("{method} {path}")));
            }
            endpoints.push(CustomEndpoint {
                method,
                path,
                route: make_route(filter),
            });
        }

        let catalogs = Family::new(Resource::Catalog, self.catalogs, self.options.catalog_cache);
        let streams = Family::new(Resource::Stream, self.streams, self.options.stream_cache);

        tracing::debug!(
            catalog_types = ?catalogs.media_types(),
            stream_types = ?streams.media_types(),
            "Built addon"
        );

        let state = AddonState {
            codec: UserDataCodec::new(self.user_data, self.options.user_data_encoding),
            manifest: self.manifest,
            manifest_bodies,
            manifest_callback: self.manifest_callback,
            catalogs,
            streams,
            stream_id,
            meta_fetcher,
            shutdown: CancellationToken::new(),
            options: self.options,
        };

        Ok(Addon {
            state: Arc::new(state),
            middleware: self.middleware,
            endpoints,
        })
    }
}

fn boxed<T, U, F, Fut>(handler: F) -> Handler<T, U>
where
    F: Fn(RequestContext, String, UserData<U>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Vec<T>, HandlerError>> + Send + 'static,
{
    Arc::new(move |ctx, id, user_data| handler(ctx, id, user_data).boxed())
}

/// Pre-serialized manifests, only when no manifest callback is registered.
pub(crate) struct ManifestBodies {
    pub(crate) plain: Bytes,
    pub(crate) configured: Bytes,
}

/// A ready to serve addon.
pub struct Addon<U = serde_json::Value> {
    state: Arc<AddonState<U>>,
    middleware: Vec<CustomMiddleware>,
    endpoints: Vec<CustomEndpoint>,
}

impl<U: AddonUserData> Addon<U> {
    /// The complete router, with all middleware applied.
    pub fn router(&self) -> Router {
        server::router(self.state.clone(), &self.middleware, &self.endpoints)
    }

    pub fn manifest(&self) -> &Manifest {
        &self.state.manifest
    }

    pub fn options(&self) -> &Options {
        &self.state.options
    }

    /// The codec requests are decoded with, e.g. for building install URLs.
    pub fn codec(&self) -> &UserDataCodec<U> {
        &self.state.codec
    }

    /// Cancelling the token shuts the server down gracefully.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.state.shutdown.clone()
    }

    /// Bind and serve until SIGINT, SIGTERM or the shutdown token.
    pub async fn run(self) -> Result<()> {
        crate::logging::init(&self.state.options.log_level, self.state.options.log_encoding)?;
        server::serve(self.router(), &self.state.options, self.state.shutdown.clone()).await
    }
}

impl<U> fmt::Debug for Addon<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Addon")
            .field("manifest", &self.state.manifest.id)
            .field("options", &self.state.options)
            .field("middleware", &self.middleware.len())
            .field("endpoints", &self.endpoints.len())
            .finish_non_exhaustive()
    }
}
