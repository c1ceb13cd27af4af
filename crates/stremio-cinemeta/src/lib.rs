//! Stremio-Cinemeta: movie and TV show lookups against Cinemeta.
//!
//! Cinemeta is the public Stremio addon that serves metadata for IMDb IDs.
//! This crate provides:
//!
//! - **Client**: `GET /meta/{movie|series}/{id}.json` with a request timeout
//! - **Caching**: a [`Cache`] trait with an in-memory [`InMemoryCache`]
//! - **Types**: the [`Meta`] object returned by Cinemeta
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use stremio_cinemeta::{Client, ClientOptions, InMemoryCache};
//!
//! # async fn example() -> stremio_cinemeta::Result<()> {
//! let client = Client::new(ClientOptions::default(), Arc::new(InMemoryCache::new()))?;
//! let meta = client.get_movie("tt1254207").await?;
//! println!("{} ({})", meta.name, meta.release_info.unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod error;
pub mod types;

pub use cache::{Cache, CacheItem, InMemoryCache};
pub use client::{Client, ClientOptions};
pub use error::{Error, Result};
pub use types::{MediaKind, Meta};
