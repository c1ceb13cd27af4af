//! Catalog and stream request handling.
//!
//! Both resource families share one pipeline: resolve the handler for the
//! media type, decode the user data, call the handler, classify its error
//! once, serialize, evaluate conditional caching and wrap the array in the
//! resource's envelope.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Serialize;

use crate::addon::{AddonUserData, RequestContext};
use crate::error::{HandlerError, Reject};
use crate::meta::Meta;
use crate::server::caching;
use crate::server::guard::ResourcePath;
use crate::server::{AddonState, Family};

pub(crate) async fn catalog<U: AddonUserData>(
    State(state): State<Arc<AddonState<U>>>,
    request: Request,
) -> Response {
    respond(&state, &state.catalogs, request).await
}

pub(crate) async fn stream<U: AddonUserData>(
    State(state): State<Arc<AddonState<U>>>,
    request: Request,
) -> Response {
    respond(&state, &state.streams, request).await
}

async fn respond<T, U>(state: &AddonState<U>, family: &Family<T, U>, request: Request) -> Response
where
    T: Serialize + Send + 'static,
    U: AddonUserData,
{
    let (parts, _body) = request.into_parts();
    let resource = family.resource.as_str();

    // The guard tags every request it lets through.
    let Some(path) = parts.extensions.get::<ResourcePath>() else {
        return Reject::invariant("resource_path_missing").into_response();
    };
    let media_type = path.media_type.as_str();
    let id = path.id.as_str();
    tracing::debug!(resource, media_type, id, "Handler called");

    let Some(handler) = family.handlers.get(media_type) else {
        tracing::warn!(resource, media_type, "Got request for unhandled type; returning 404");
        return Reject::NOT_FOUND.into_response();
    };

    let user_data = match state.codec.decode(path.user_data.as_deref().unwrap_or_default()) {
        Ok(user_data) => user_data,
        Err(_) => return Reject::BAD_REQUEST.into_response(),
    };

    let cancel = state.shutdown.child_token();
    let _cancel_on_drop = cancel.clone().drop_guard();
    let ctx = RequestContext::new(cancel, parts.extensions.get::<Meta>().cloned(), path.flags);

    let items = match handler(ctx, id.to_string(), user_data).await {
        Ok(items) => items,
        Err(err) => {
            match &err {
                HandlerError::NotFound => {
                    tracing::warn!(resource, media_type, id, "Got request for unhandled media ID; returning 404")
                }
                HandlerError::BadRequest => {
                    tracing::warn!(resource, media_type, id, "Got bad request; returning 400")
                }
                HandlerError::Other(e) => {
                    tracing::error!(resource, media_type, id, error = ?e, "Addon returned error")
                }
            }
            return Reject::from(&err).into_response();
        }
    };

    let body = match serde_json::to_vec(&items) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(resource, media_type, id, error = %e, "Couldn't marshal response");
            return Reject::invariant("response_serialization").into_response();
        }
    };

    let etag = family.cache.etag.then(|| caching::etag(&body));
    if let Some(etag) = &etag {
        if caching::not_modified(&parts.headers, etag) {
            tracing::debug!(resource, media_type, id, etag = %etag, "ETag matches, responding with 304");
            let mut response = StatusCode::NOT_MODIFIED.into_response();
            set_cache_headers(response.headers_mut(), family, etag.as_str());
            return response;
        }
    }

    let body = envelope(family.resource.envelope_key(), &body);
    let mut response = (
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response();
    if let Some(etag) = &etag {
        set_cache_headers(response.headers_mut(), family, etag.as_str());
    } else if let Some(cache_control) = &family.cache_control {
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, cache_control.clone());
    }
    response
}

/// `Cache-Control` is required on 304 responses as well, and the `ETag` is
/// repeated so clients don't overwrite their stored validator.
fn set_cache_headers<T, U>(headers: &mut HeaderMap, family: &Family<T, U>, etag: &str) {
    if let Some(cache_control) = &family.cache_control {
        headers.insert(header::CACHE_CONTROL, cache_control.clone());
    }
    if let Ok(value) = HeaderValue::from_str(etag) {
        headers.insert(header::ETAG, value);
    }
}

/// `{"<key>":<array>}` without serializing the array again.
pub(crate) fn envelope(key: &str, array: &[u8]) -> Bytes {
    let mut out = Vec::with_capacity(array.len() + key.len() + 5);
    out.extend_from_slice(b"{\"");
    out.extend_from_slice(key.as_bytes());
    out.extend_from_slice(b"\":");
    out.extend_from_slice(array);
    out.push(b'}');
    Bytes::from(out)
}
