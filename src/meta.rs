//! Movie / TV show lookups for stream requests.
//!
//! Used to hand the title to stream handlers and to log it along with the
//! request. The default fetcher is the Cinemeta client with an in-memory cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stremio_cinemeta::{Client, ClientOptions, InMemoryCache};
use tokio_util::sync::CancellationToken;

pub use stremio_cinemeta::Meta;

/// Fetches movie and TV show info by IMDb ID.
///
/// Implementations are expected to cache results; the Cinemeta client keeps
/// them for 30 days by default.
#[async_trait]
pub trait MetaFetcher: Send + Sync {
    async fn get_movie(&self, cancel: &CancellationToken, imdb_id: &str) -> anyhow::Result<Meta>;

    async fn get_tv_show(
        &self,
        cancel: &CancellationToken,
        imdb_id: &str,
        season: u32,
        episode: u32,
    ) -> anyhow::Result<Meta>;
}

#[async_trait]
impl MetaFetcher for Client {
    async fn get_movie(&self, cancel: &CancellationToken, imdb_id: &str) -> anyhow::Result<Meta> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => anyhow::bail!("Movie lookup cancelled"),
            meta = Client::get_movie(self, imdb_id) => Ok(meta?),
        }
    }

    async fn get_tv_show(
        &self,
        cancel: &CancellationToken,
        imdb_id: &str,
        season: u32,
        episode: u32,
    ) -> anyhow::Result<Meta> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => anyhow::bail!("TV show lookup cancelled"),
            meta = Client::get_tv_show(self, imdb_id, season, episode) => Ok(meta?),
        }
    }
}

/// Build the Cinemeta-backed fetcher used when the addon doesn't supply one.
pub fn default_fetcher(timeout: Duration) -> Result<Arc<dyn MetaFetcher>, stremio_cinemeta::Error> {
    let opts = ClientOptions {
        timeout,
        ..Default::default()
    };
    let client = Client::new(opts, Arc::new(InMemoryCache::new()))?;
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancelled_lookup_returns_early() {
        let client = Client::new(
            ClientOptions {
                base_url: "http://127.0.0.1:9".into(),
                ..Default::default()
            },
            Arc::new(InMemoryCache::new()),
        )
        .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let fetcher: &dyn MetaFetcher = &client;
        let err = fetcher.get_movie(&cancel, "tt1254207").await.unwrap_err();
        assert_eq!(err.to_string(), "Movie lookup cancelled");
    }

    #[test]
    fn default_fetcher_builds() {
        assert!(default_fetcher(Duration::from_secs(2)).is_ok());
    }
}
