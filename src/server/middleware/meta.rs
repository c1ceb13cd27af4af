//! Movie / TV show lookups for stream requests.
//!
//! With `put_meta_in_context` the lookup finishes before the handler runs and
//! the handler finds the result in its context. With only `log_media_name`
//! the lookup runs as its own task next to the handler, and the request
//! logger waits for it through the request's [`MetaSignal`].

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tokio_util::sync::CancellationToken;

use crate::config::Options;
use crate::meta::{Meta, MetaFetcher};
use crate::server::guard::ResourcePath;
use crate::server::middleware::logging::MetaSignal;

#[derive(Clone)]
pub(crate) struct MetaConfig(Arc<MetaInner>);

struct MetaInner {
    fetcher: Arc<dyn MetaFetcher>,
    put_in_context: bool,
    timeout: Duration,
    shutdown: CancellationToken,
}

impl MetaConfig {
    pub(crate) fn new(
        fetcher: Arc<dyn MetaFetcher>,
        options: &Options,
        shutdown: CancellationToken,
    ) -> Self {
        Self(Arc::new(MetaInner {
            fetcher,
            put_in_context: options.put_meta_in_context,
            timeout: options.meta_timeout(),
            shutdown,
        }))
    }
}

/// Route layer on the stream routes, inside the guard.
pub(crate) async fn lookup(
    State(cfg): State<MetaConfig>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(path) = request.extensions().get::<ResourcePath>().cloned() else {
        return next.run(request).await;
    };
    let signal = request.extensions().get::<MetaSignal>().cloned();
    let cancel = cfg.0.shutdown.child_token();

    if cfg.0.put_in_context {
        let tx = signal.map(|s| s.pending());
        if let Some(meta) = fetch(&cfg.0, &cancel, &path).await {
            if let Some(tx) = tx {
                let _ = tx.send(meta.clone());
            }
            request.extensions_mut().insert(meta);
        }
    } else if let Some(signal) = signal {
        let tx = signal.pending();
        tokio::spawn(async move {
            if let Some(meta) = fetch(&cfg.0, &cancel, &path).await {
                let _ = tx.send(meta);
            }
        });
    }

    next.run(request).await
}

async fn fetch(cfg: &MetaInner, cancel: &CancellationToken, path: &ResourcePath) -> Option<Meta> {
    let id = path.id.as_str();
    let lookup = async {
        match path.media_type.as_str() {
            "movie" => match cfg.fetcher.get_movie(cancel, id).await {
                Ok(meta) => Some(meta),
                Err(e) => {
                    tracing::error!(id, error = %e, "Couldn't get movie info with MetaFetcher");
                    None
                }
            },
            "series" => {
                let Some((imdb_id, season, episode)) = parse_episode_id(id) else {
                    tracing::warn!(id, "Couldn't parse TV show ID as \"id:season:episode\"");
                    return None;
                };
                match cfg.fetcher.get_tv_show(cancel, imdb_id, season, episode).await {
                    Ok(meta) => Some(meta),
                    Err(e) => {
                        tracing::error!(id, error = %e, "Couldn't get TV show info with MetaFetcher");
                        None
                    }
                }
            }
            _ => None,
        }
    };

    match tokio::time::timeout(cfg.timeout, lookup).await {
        Ok(Some(meta)) => {
            tracing::debug!(id, meta = ?meta, "Got meta from MetaFetcher");
            Some(meta)
        }
        Ok(None) => None,
        Err(_) => {
            tracing::warn!(id, timeout = ?cfg.timeout, "Meta lookup timed out");
            None
        }
    }
}

/// Split "tt0903747:1:2" into IMDb ID, season and episode.
fn parse_episode_id(id: &str) -> Option<(&str, u32, u32)> {
    let mut parts = id.split(':');
    let imdb_id = parts.next().filter(|s| !s.is_empty())?;
    let season = parts.next()?.parse().ok()?;
    let episode = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((imdb_id, season, episode))
}
