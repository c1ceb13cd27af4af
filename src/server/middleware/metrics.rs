//! Request metrics.
//!
//! Every completed request increments `http_requests_total{endpoint,status}`
//! through the `metrics` facade. The process-wide Prometheus recorder renders
//! them at "/metrics".

use std::sync::OnceLock;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Install the Prometheus recorder once per process.
///
/// Returns `None` when a different recorder was installed before.
pub fn handle() -> Option<PrometheusHandle> {
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "Couldn't install Prometheus recorder");
                None
            }
        })
        .clone()
}

pub(crate) async fn track(request: Request, next: Next) -> Response {
    let endpoint = classify(request.uri().path());
    let response = next.run(request).await;
    metrics::counter!(
        "http_requests_total",
        "endpoint" => endpoint,
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);
    response
}

/// Map a request path to a small fixed label set.
pub fn classify(path: &str) -> &'static str {
    match path {
        "/" => return "root",
        "/manifest.json" => return "manifest",
        "/configure" => return "configure",
        "/health" => return "health",
        "/metrics" => return "metrics",
        _ => {}
    }

    if path.starts_with("/catalog/") {
        return "catalog";
    }
    if path.starts_with("/stream/") {
        return "stream";
    }
    if path.starts_with("/configure") {
        return "configure-other";
    }

    // Paths with user data: "/{user_data}/<rest>"
    let rest = path
        .strip_prefix('/')
        .and_then(|p| p.split_once('/'))
        .map(|(_, rest)| rest)
        .unwrap_or_default();
    if rest == "manifest.json" {
        "manifest-data"
    } else if rest.starts_with("catalog/") && rest.ends_with(".json") {
        "catalog-data"
    } else if rest.starts_with("stream/") && rest.ends_with(".json") {
        "stream-data"
    } else {
        "other"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels() {
        let cases = [
            ("/", "root"),
            ("/manifest.json", "manifest"),
            ("/configure", "configure"),
            ("/configure/style.css", "configure-other"),
            ("/health", "health"),
            ("/metrics", "metrics"),
            ("/catalog/movie/top.json", "catalog"),
            ("/stream/movie/tt1254207.json", "stream"),
            ("/abc/manifest.json", "manifest-data"),
            ("/abc/catalog/movie/top.json", "catalog-data"),
            ("/abc/stream/series/tt0903747%3A1%3A1.json", "stream-data"),
            ("/abc/configure", "other"),
            ("/favicon.ico", "other"),
            ("/abc/stream/movie/x", "other"),
        ];
        for (path, expected) in cases {
            assert_eq!(classify(path), expected, "{path}");
        }
    }
}
