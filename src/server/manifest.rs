//! The manifest resource.
//!
//! Served at "/manifest.json" and "/{user_data}/manifest.json". The latter
//! always reports `configurationRequired: false`, otherwise clients don't
//! offer to install the configured addon.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::{self, HeaderValue};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::addon::{AddonUserData, RequestContext, RequestFlags};
use crate::error::Reject;
use crate::server::AddonState;

pub(crate) async fn manifest<U: AddonUserData>(
    State(state): State<Arc<AddonState<U>>>,
    uri: Uri,
) -> Response {
    tracing::debug!("Manifest handler called");

    // Still escaped, the codec unescapes it.
    let token = uri
        .path()
        .strip_suffix("/manifest.json")
        .map(|p| p.trim_start_matches('/'))
        .filter(|p| !p.is_empty());
    let configured = token.is_some();

    // Reachable without any configuration, so absent user data is fine here.
    let user_data = match state.codec.decode(token.unwrap_or_default()) {
        Ok(user_data) => user_data,
        Err(_) => return Reject::BAD_REQUEST.into_response(),
    };

    let Some(callback) = &state.manifest_callback else {
        let Some(bodies) = &state.manifest_bodies else {
            return Reject::invariant("manifest_bodies_missing").into_response();
        };
        let body = if configured {
            bodies.configured.clone()
        } else {
            bodies.plain.clone()
        };
        return json(body);
    };

    let cancel = state.shutdown.child_token();
    let _cancel_on_drop = cancel.clone().drop_guard();
    let ctx = RequestContext::new(
        cancel,
        None,
        RequestFlags {
            configured,
            stream: false,
        },
    );

    let mut manifest = state.manifest.clone();
    let status = callback(&ctx, &mut manifest, &user_data);
    if status.as_u16() >= 400 {
        tracing::debug!(status = status.as_u16(), "Manifest callback rejected request");
        return status.into_response();
    }

    // Must hold no matter what the callback did.
    if configured {
        manifest.behavior_hints.configuration_required = false;
    }

    match serde_json::to_vec(&manifest) {
        Ok(body) => json(Bytes::from(body)),
        Err(e) => {
            tracing::error!(error = %e, "Couldn't marshal manifest");
            Reject::invariant("manifest_serialization").into_response()
        }
    }
}

fn json(body: Bytes) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response()
}
