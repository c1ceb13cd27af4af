mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

use crate::error::Error;

/// Load addon options from a TOML file
pub fn load_options(path: &Path) -> Result<Options> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let options: Options = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_options(&options)
        .with_context(|| format!("Invalid config file: {:?}", path))?;

    Ok(options)
}

/// Check option combinations that can't work together.
///
/// Caching flags are only meaningful together with a non-zero cache age.
pub fn validate_options(options: &Options) -> crate::Result<()> {
    if options.port == 0 {
        return Err(Error::Address("port cannot be 0".to_string()));
    }

    for (what, policy) in [
        ("catalogs", &options.catalog_cache),
        ("streams", &options.stream_cache),
    ] {
        if (policy.etag || policy.public) && !policy.enabled() {
            return Err(Error::CacheWithoutAge(what));
        }
    }

    crate::logging::parse_level(&options.log_level)?;

    Ok(())
}
