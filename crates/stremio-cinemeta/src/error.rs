//! Error types for Cinemeta lookups.

use crate::types::MediaKind;

/// Error type for the Cinemeta client and its caches.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The HTTP client could not be constructed.
    #[error("Couldn't build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// The request could not be sent or timed out.
    #[error("Couldn't GET {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Cinemeta answered with a non-200 status.
    #[error("Bad GET response: {0}")]
    Status(u16),

    /// The response body was not a valid Cinemeta meta response.
    #[error("Couldn't decode response body: {0}")]
    Decode(#[source] reqwest::Error),

    /// The response was valid JSON but carried no name.
    #[error("Couldn't find {0} name in Cinemeta response")]
    MissingName(MediaKind),

    /// A cache backend failed.
    #[error("Cache error: {0}")]
    Cache(String),
}

impl Error {
    /// Create a new Cache error.
    pub fn cache<S: Into<String>>(msg: S) -> Self {
        Self::Cache(msg.into())
    }
}

/// Result type alias using the Cinemeta error type.
pub type Result<T> = std::result::Result<T, Error>;
