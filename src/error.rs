//! Error types.
//!
//! [`Error`] covers everything that can go wrong while building or running
//! an addon. [`HandlerError`] is what catalog and stream handlers return; the
//! dispatch pipeline classifies it exactly once into an HTTP status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Error type for addon construction and the server lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The manifest lacks one of id, name, description or version.
    #[error("An empty manifest was passed")]
    EmptyManifest,

    /// Neither a catalog nor a stream handler was registered.
    #[error("No handler was passed")]
    NoHandlers,

    /// A caching option was set without a cache age for the same resource.
    #[error("Caching options for {0} only make sense when also setting a cache age")]
    CacheWithoutAge(&'static str),

    /// The stream ID pattern is not a valid regular expression.
    #[error("Invalid stream ID pattern: {0}")]
    StreamIdPattern(#[from] regex::Error),

    /// Meta lookups were requested but no fetcher could be set up.
    #[error("Couldn't create meta fetcher: {0}")]
    MetaFetcher(#[from] stremio_cinemeta::Error),

    /// An unknown log level was configured.
    #[error(r#"Unknown log level "{0}" - only knows ["debug", "info", "warn", "error"]"#)]
    LogLevel(String),

    /// An unknown log encoding was configured.
    #[error(r#"Unknown log encoding "{0}" - only knows ["console", "json"]"#)]
    LogEncoding(String),

    /// The manifest could not be serialized.
    #[error("Couldn't serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A custom endpoint uses an unsupported method, a reserved path or was
    /// registered twice.
    #[error("Invalid custom endpoint {0}")]
    Endpoint(String),

    /// The server address is invalid.
    #[error("Invalid server address: {0}")]
    Address(String),

    /// An I/O operation failed (bind, accept).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the addon error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by catalog and stream handlers.
///
/// `NotFound` and `BadRequest` are signals to the client. Anything else is
/// logged with full detail and answered with a bare 500.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The catalog / item / stream does not exist. Leads to 404.
    #[error("Not found")]
    NotFound,

    /// The client sent a bad request. Leads to 400.
    #[error("Bad request")]
    BadRequest,

    /// Any other failure. Leads to 500.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    /// Wrap an arbitrary error as [`HandlerError::Other`].
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(anyhow::Error::new(err))
    }

    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::NotFound => StatusCode::NOT_FOUND,
            HandlerError::BadRequest => StatusCode::BAD_REQUEST,
            HandlerError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A bodiless error response.
///
/// Error responses never carry internal error text, so this only holds the
/// status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reject(pub StatusCode);

impl Reject {
    pub const BAD_REQUEST: Reject = Reject(StatusCode::BAD_REQUEST);
    pub const NOT_FOUND: Reject = Reject(StatusCode::NOT_FOUND);
    pub const INTERNAL: Reject = Reject(StatusCode::INTERNAL_SERVER_ERROR);

    /// Record a server-side invariant violation and produce a 500.
    ///
    /// These indicate a logic bug rather than a client mistake, so they are
    /// counted separately for alerting.
    pub fn invariant(what: &'static str) -> Reject {
        tracing::error!(invariant = what, "Invariant violation");
        metrics::counter!("invariant_violations_total", "invariant" => what).increment(1);
        Reject::INTERNAL
    }
}

impl IntoResponse for Reject {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

impl From<&HandlerError> for Reject {
    fn from(e: &HandlerError) -> Self {
        Reject(e.status())
    }
}
