//! Request logging.
//!
//! One "Handled request" event per request, emitted after the response was
//! produced. When the media name is logged, the event waits for the meta
//! lookup of the request to complete, so the name is never missing due to
//! a race.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::USER_AGENT;
use axum::middleware::Next;
use axum::response::Response;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::config::Options;
use crate::meta::Meta;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LogConfig {
    pub(crate) log_ips: bool,
    pub(crate) log_user_agent: bool,
    pub(crate) log_media_name: bool,
}

impl From<&Options> for LogConfig {
    fn from(options: &Options) -> Self {
        Self {
            log_ips: options.log_ips,
            log_user_agent: options.log_user_agent,
            log_media_name: options.log_media_name,
        }
    }
}

/// Completion signal of the meta lookup for one request.
///
/// Put into the request extensions by the logging middleware; the meta
/// middleware installs the receiving half when it starts a lookup.
#[derive(Clone, Default)]
pub(crate) struct MetaSignal(Arc<Mutex<Option<oneshot::Receiver<Meta>>>>);

impl MetaSignal {
    /// Start a lookup. The returned sender is dropped if the lookup fails.
    pub(crate) fn pending(&self) -> oneshot::Sender<Meta> {
        let (tx, rx) = oneshot::channel();
        *self.0.lock() = Some(rx);
        tx
    }

    fn take(&self) -> Option<oneshot::Receiver<Meta>> {
        self.0.lock().take()
    }
}

pub(crate) async fn log_requests(
    State(cfg): State<LogConfig>,
    mut request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let url = request.uri().to_string();
    let (ip, forwarded_for) = if cfg.log_ips {
        let ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_default();
        let forwarded_for = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        (Some(ip), Some(forwarded_for))
    } else {
        (None, None)
    };
    let user_agent = cfg.log_user_agent.then(|| {
        request
            .headers()
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    });

    let signal = cfg.log_media_name.then(MetaSignal::default);
    if let Some(signal) = &signal {
        request.extensions_mut().insert(signal.clone());
    }

    let response = next.run(request).await;

    // Only stream requests that passed the guard start a lookup.
    let media_name = match signal.and_then(|s| s.take()) {
        Some(rx) => Some(match rx.await {
            Ok(meta) => meta.display_title(),
            Err(_) => "?".to_string(),
        }),
        None => None,
    };

    let duration = format!("{}ms", start.elapsed().as_millis());
    tracing::info!(
        status = response.status().as_u16(),
        duration = %duration,
        method = %method,
        url = %url,
        ip = ip.as_deref(),
        forwarded_for = forwarded_for.as_deref(),
        user_agent = user_agent.as_deref(),
        media_name = media_name.as_deref(),
        "Handled request"
    );

    response
}
