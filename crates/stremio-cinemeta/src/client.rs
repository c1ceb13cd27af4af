//! Cinemeta HTTP client.
//!
//! Lookups hit the cache first and fall back to the remote addon. Fresh
//! responses are written back to the cache; cache failures are logged and
//! never fail a lookup.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::types::{CinemetaResponse, MediaKind, Meta};

const DEFAULT_BASE_URL: &str = "https://v3-cinemeta.strem.io";

/// Options for the Cinemeta [`Client`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL of the Cinemeta addon.
    pub base_url: String,
    /// Upper bound for a single remote lookup.
    pub timeout: Duration,
    /// Max age of cached items. Zero disables cache hits.
    pub ttl: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(2),
            ttl: Duration::from_secs(30 * 24 * 60 * 60),
        }
    }
}

/// Cinemeta client.
///
/// Cheap to share behind an `Arc`; the underlying `reqwest::Client` pools
/// connections across lookups.
pub struct Client {
    base_url: String,
    http: reqwest::Client,
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(opts: ClientOptions, cache: Arc<dyn Cache>) -> Result<Self> {
        let base_url = if opts.base_url.is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            opts.base_url.trim_end_matches('/').to_string()
        };
        let timeout = if opts.timeout.is_zero() {
            ClientOptions::default().timeout
        } else {
            opts.timeout
        };

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::ClientBuild)?;

        Ok(Self {
            base_url,
            http,
            cache,
            ttl: opts.ttl,
        })
    }

    /// Look up a movie by IMDb ID.
    pub async fn get_movie(&self, imdb_id: &str) -> Result<Meta> {
        self.get_meta(MediaKind::Movie, imdb_id, imdb_id).await
    }

    /// Look up the TV show an episode belongs to.
    ///
    /// Season and episode only appear in logs; Cinemeta returns the meta of
    /// the whole show.
    pub async fn get_tv_show(&self, imdb_id: &str, season: u32, episode: u32) -> Result<Meta> {
        self.get_meta(
            MediaKind::TvShow,
            imdb_id,
            &format!("{imdb_id}:{season}:{episode}"),
        )
        .await
    }

    async fn get_meta(&self, kind: MediaKind, imdb_id: &str, log_id: &str) -> Result<Meta> {
        match self.cache.get(imdb_id) {
            Err(e) => {
                tracing::error!(imdb_id = log_id, error = %e, "Couldn't read meta from cache");
            }
            Ok(None) => {
                tracing::debug!(imdb_id = log_id, "Meta not found in cache");
            }
            Ok(Some(item)) => {
                let age = (Utc::now() - item.created).to_std().unwrap_or_default();
                if age > self.ttl {
                    tracing::debug!(
                        imdb_id = log_id,
                        expired_since = ?(age - self.ttl),
                        "Hit cache for meta, but item is expired"
                    );
                } else {
                    tracing::debug!(imdb_id = log_id, "Hit cache for meta");
                    return Ok(item.meta);
                }
            }
        }

        let url = format!(
            "{}/meta/{}/{}.json",
            self.base_url,
            kind.path_segment(),
            imdb_id
        );
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| Error::Request {
                url: url.clone(),
                source,
            })?;

        if resp.status() != reqwest::StatusCode::OK {
            return Err(Error::Status(resp.status().as_u16()));
        }

        let body: CinemetaResponse = resp.json().await.map_err(Error::Decode)?;
        if body.meta.name.is_empty() {
            return Err(Error::MissingName(kind));
        }

        if let Err(e) = self.cache.set(imdb_id, body.meta.clone()) {
            tracing::error!(imdb_id = log_id, error = %e, "Couldn't cache meta");
        }

        Ok(body.meta)
    }
}
