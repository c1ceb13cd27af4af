use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::user_data::UserDataEncoding;

/// Options that configure the addon server.
///
/// Every field has a default, so an empty TOML file is a valid configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Options {
    /// Interface to bind to. "0.0.0.0" binds to all interfaces, "localhost"
    /// excludes requests from other machines.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// One of "debug", "info", "warn" and "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_encoding: LogEncoding,

    /// Requests are logged unless this is set.
    #[serde(default)]
    pub disable_request_logging: bool,

    /// Log the client IP and the `X-Forwarded-For` chain.
    #[serde(default)]
    pub log_ips: bool,

    #[serde(default)]
    pub log_user_agent: bool,

    /// Where requests to "/" are redirected to. Without it they lead to 404.
    #[serde(default)]
    pub redirect_url: Option<String>,

    /// Collect request metrics and expose them at "/metrics".
    ///
    /// No credentials are required for accessing it, so protect the route in
    /// the reverse proxy when exposing the addon to the public.
    #[serde(default)]
    pub metrics: bool,

    #[serde(default)]
    pub catalog_cache: CachePolicy,

    #[serde(default)]
    pub stream_cache: CachePolicy,

    #[serde(default)]
    pub user_data_encoding: UserDataEncoding,

    /// Look up the movie / TV show for stream requests and hand it to the
    /// stream handler.
    #[serde(default)]
    pub put_meta_in_context: bool,

    /// Include the movie / TV show name and year in the request log.
    /// Only applies to stream requests.
    #[serde(default)]
    pub log_media_name: bool,

    /// Upper bound for a single meta lookup.
    #[serde(default = "default_meta_timeout_ms")]
    pub meta_timeout_ms: u64,

    /// Directory with the HTML files served at "/configure".
    #[serde(default)]
    pub configure_dir: Option<PathBuf>,

    /// Regex for accepted stream IDs, e.g. `^tt\d{7,8}$`.
    /// URL-escaped IDs are unescaped before matching.
    #[serde(default)]
    pub stream_id_pattern: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// How long in-flight requests may take to finish after a shutdown signal.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

fn default_bind_addr() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_meta_timeout_ms() -> u64 {
    2000
}
fn default_request_timeout() -> u64 {
    15
}
fn default_shutdown_grace() -> u64 {
    9
}

impl Default for Options {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            log_level: default_log_level(),
            log_encoding: LogEncoding::default(),
            disable_request_logging: false,
            log_ips: false,
            log_user_agent: false,
            redirect_url: None,
            metrics: false,
            catalog_cache: CachePolicy::default(),
            stream_cache: CachePolicy::default(),
            user_data_encoding: UserDataEncoding::default(),
            put_meta_in_context: false,
            log_media_name: false,
            meta_timeout_ms: default_meta_timeout_ms(),
            configure_dir: None,
            stream_id_pattern: None,
            request_timeout_secs: default_request_timeout(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

impl Options {
    pub fn meta_timeout(&self) -> Duration {
        Duration::from_millis(self.meta_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Whether a meta fetcher is needed at all.
    pub fn needs_meta(&self) -> bool {
        self.put_meta_in_context || self.log_media_name
    }
}

/// Client and proxy side caching of catalog or stream responses.
///
/// Responses are never cached on the server side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CachePolicy {
    /// `max-age` of the `Cache-Control` header. Zero means no caching headers.
    #[serde(default)]
    pub max_age_secs: u64,

    /// Allow proxies to cache responses.
    #[serde(default)]
    pub public: bool,

    /// Set the `ETag` header and honor `If-None-Match`.
    /// Every handler result gets hashed.
    #[serde(default)]
    pub etag: bool,
}

impl CachePolicy {
    pub fn enabled(&self) -> bool {
        self.max_age_secs > 0
    }

    /// Value of the `Cache-Control` header, if any.
    pub fn header_value(&self) -> Option<String> {
        if !self.enabled() {
            return None;
        }
        let scope = if self.public { "public" } else { "private" };
        Some(format!("max-age={}, {}", self.max_age_secs, scope))
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogEncoding {
    /// Human readable lines.
    #[default]
    Console,
    /// One JSON object per line, for log aggregation.
    Json,
}

impl FromStr for LogEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "console" => Ok(LogEncoding::Console),
            "json" => Ok(LogEncoding::Json),
            other => Err(Error::LogEncoding(other.to_string())),
        }
    }
}
