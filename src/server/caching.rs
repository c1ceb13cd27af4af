//! ETag computation and `If-None-Match` evaluation.

use axum::http::header::{HeaderMap, HeaderValue, IF_NONE_MATCH};
use xxhash_rust::xxh64::xxh64;

/// Strong validator for a response body: the quoted hex xxh64 digest.
pub(crate) fn etag(body: &[u8]) -> String {
    format!("\"{:x}\"", xxh64(body, 0))
}

/// Whether the client's cached copy is still fresh.
///
/// Accepts `*`, comma separated lists, weak validators and unquoted digests
/// as sent by some clients.
pub(crate) fn not_modified(headers: &HeaderMap, etag: &str) -> bool {
    let bare = etag.trim_matches('"');
    headers
        .get_all(IF_NONE_MATCH)
        .iter()
        .filter_map(|v: &HeaderValue| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .any(|candidate| {
            if candidate == "*" {
                return true;
            }
            let candidate = candidate.strip_prefix("W/").unwrap_or(candidate);
            candidate.trim_matches('"') == bare
        })
}
