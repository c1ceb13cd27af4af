//! Operator middleware attached at a path prefix.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::addon::CustomMiddleware;

pub(crate) async fn run(State(mw): State<CustomMiddleware>, request: Request, next: Next) -> Response {
    if matches_prefix(&mw.prefix, request.uri().path()) {
        (mw.handler)(request, next).await
    } else {
        next.run(request).await
    }
}

/// Segment-wise prefix match where `{...}` matches any single segment.
fn matches_prefix(prefix: &str, path: &str) -> bool {
    let mut path_segments = path.trim_start_matches('/').split('/');
    prefix
        .trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .all(|expected| match path_segments.next() {
            Some(actual) if expected.starts_with('{') && expected.ends_with('}') => !actual.is_empty(),
            Some(actual) => actual == expected,
            None => false,
        })
}
