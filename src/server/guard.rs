//! Route guard for catalog and stream requests.
//!
//! Runs before any handler. A request is either rejected right here or
//! accepted and tagged with a [`ResourcePath`] that the rest of the chain
//! reads from the request extensions.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use regex::Regex;

use crate::error::Reject;
use crate::server::Resource;

/// Derived per-request flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestFlags {
    /// The path carries user data.
    pub configured: bool,
    /// This is a stream request.
    pub stream: bool,
}

/// An accepted catalog or stream request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    pub resource: Resource,
    pub media_type: String,
    /// Percent-decoded and stripped of the ".json" suffix.
    pub id: String,
    /// The raw user data segment, still encoded.
    pub user_data: Option<String>,
    pub flags: RequestFlags,
}

#[derive(Clone)]
pub(crate) struct GuardConfig(Arc<GuardInner>);

struct GuardInner {
    resource: Resource,
    requires_configuration: bool,
    stream_id: Option<Regex>,
}

impl GuardConfig {
    pub(crate) fn new(resource: Resource, requires_configuration: bool, stream_id: Option<Regex>) -> Self {
        Self(Arc::new(GuardInner {
            resource,
            requires_configuration,
            stream_id,
        }))
    }

    /// Check the raw path parameters of a request.
    pub(crate) fn check<'a>(
        &self,
        params: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<ResourcePath, Reject> {
        let cfg = &self.0;

        let mut media_type = "";
        let mut id = "";
        let mut user_data = None;
        for (key, value) in params {
            match key {
                "type" => media_type = value,
                "id" => id = value,
                "user_data" => user_data = Some(value),
                _ => {}
            }
        }

        // Clients must send user data when the addon can't work without it.
        // That's a bad request rather than a missing resource.
        if cfg.requires_configuration && user_data.is_none() {
            tracing::debug!("Rejecting request without required user data");
            return Err(Reject::BAD_REQUEST);
        }

        let Some(id) = id.strip_suffix(".json") else {
            return Err(Reject::NOT_FOUND);
        };
        if media_type.is_empty() || id.is_empty() {
            tracing::debug!("Rejecting bad request due to missing type or ID");
            return Err(Reject::BAD_REQUEST);
        }

        let id = urlencoding::decode(id).map_err(|e| {
            tracing::warn!(id, error = %e, "Couldn't unescape ID");
            Reject::INTERNAL
        })?;

        let stream = cfg.resource == Resource::Stream;
        if stream {
            if let Some(pattern) = &cfg.stream_id {
                if !pattern.is_match(&id) {
                    tracing::debug!(id = %id, "Rejecting bad request due to stream ID not matching the given regex");
                    return Err(Reject::BAD_REQUEST);
                }
            }
        }

        Ok(ResourcePath {
            resource: cfg.resource,
            media_type: media_type.to_string(),
            id: id.into_owned(),
            user_data: user_data.map(str::to_string),
            flags: RequestFlags {
                configured: user_data.is_some(),
                stream,
            },
        })
    }
}

/// Path parameters as sent, still escaped.
///
/// The routes only match "/{resource}/{type}/{id}" and
/// "/{user_data}/{resource}/{type}/{id}", so the segment count tells them apart.
fn raw_params(path: &str) -> Vec<(&str, &str)> {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    match segments.as_slice() {
        [_, media_type, id] => vec![("type", *media_type), ("id", *id)],
        [user_data, _, media_type, id] => vec![
            ("user_data", *user_data),
            ("type", *media_type),
            ("id", *id),
        ],
        _ => Vec::new(),
    }
}

/// Middleware applied as route layer to the catalog and stream routes.
pub(crate) async fn guard(
    State(cfg): State<GuardConfig>,
    mut request: Request,
    next: Next,
) -> Response {
    let checked = cfg.check(raw_params(request.uri().path()));
    match checked {
        Ok(path) => {
            request.extensions_mut().insert(path);
            next.run(request).await
        }
        Err(reject) => reject.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn imdb() -> Option<Regex> {
        Some(Regex::new(r"^tt\d{7,8}$").unwrap())
    }

    #[test]
    fn accepts_catalog() {
        let cfg = GuardConfig::new(Resource::Catalog, false, None);
        let path = cfg
            .check([("type", "movie"), ("id", "top.json")])
            .unwrap();
        assert_eq!(path.media_type, "movie");
        assert_eq!(path.id, "top");
        assert_eq!(path.user_data, None);
        assert_eq!(path.flags, RequestFlags::default());
    }

    #[test]
    fn tags_configured_stream() {
        let cfg = GuardConfig::new(Resource::Stream, true, None);
        let path = cfg
            .check([("user_data", "abc"), ("type", "series"), ("id", "tt0903747%3A1%3A2.json")])
            .unwrap();
        assert_eq!(path.id, "tt0903747:1:2");
        assert_eq!(path.user_data.as_deref(), Some("abc"));
        assert!(path.flags.configured);
        assert!(path.flags.stream);
    }

    #[test]
    fn missing_user_data_when_required() {
        let cfg = GuardConfig::new(Resource::Catalog, true, None);
        let err = cfg.check([("type", "movie"), ("id", "top.json")]).unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn empty_id() {
        let cfg = GuardConfig::new(Resource::Catalog, false, None);
        let err = cfg.check([("type", "movie"), ("id", ".json")]).unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_suffix_is_not_found() {
        let cfg = GuardConfig::new(Resource::Catalog, false, None);
        let err = cfg.check([("type", "movie"), ("id", "top")]).unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn stream_id_pattern() {
        let cfg = GuardConfig::new(Resource::Stream, false, imdb());
        assert!(cfg.check([("type", "movie"), ("id", "tt1254207.json")]).is_ok());
        let err = cfg
            .check([("type", "movie"), ("id", "garbage.json")])
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn pattern_ignored_for_catalogs() {
        let cfg = GuardConfig::new(Resource::Catalog, false, imdb());
        assert!(cfg.check([("type", "movie"), ("id", "garbage.json")]).is_ok());
    }

    #[test]
    fn pattern_matches_unescaped_id() {
        let cfg = GuardConfig::new(Resource::Stream, false, Some(Regex::new("^a b$").unwrap()));
        assert!(cfg.check([("type", "movie"), ("id", "a%20b.json")]).is_ok());
    }

    #[test]
    fn raw_params_by_segment_count() {
        assert_eq!(
            raw_params("/stream/movie/tt1254207.json"),
            vec![("type", "movie"), ("id", "tt1254207.json")]
        );
        assert_eq!(
            raw_params("/a%20b/stream/series/tt0903747%3A1%3A2.json"),
            vec![
                ("user_data", "a%20b"),
                ("type", "series"),
                ("id", "tt0903747%3A1%3A2.json")
            ]
        );
        assert!(raw_params("/manifest.json").is_empty());
    }

    #[test]
    fn invalid_utf8_escape_is_internal() {
        let cfg = GuardConfig::new(Resource::Stream, false, None);
        let err = cfg.check([("type", "movie"), ("id", "%FF.json")]).unwrap_err();
        assert_eq!(err.0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
