use axum::http::header::{
    HeaderName, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONTENT_LANGUAGE, CONTENT_TYPE, ORIGIN,
};
use axum::http::Method;
use tower_http::cors::{Any, CorsLayer};

/// Clients don't show stream responses without CORS headers.
///
/// The header list is the one of the Stremio example addon.
pub fn layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD])
        .allow_headers([
            ACCEPT,
            ACCEPT_LANGUAGE,
            CONTENT_TYPE,
            ORIGIN,
            ACCEPT_ENCODING,
            CONTENT_LANGUAGE,
            HeaderName::from_static("x-requested-with"),
        ])
}
