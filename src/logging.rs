//! Logger setup.
//!
//! The SDK only emits `tracing` events. [`init`] installs a global `fmt`
//! subscriber for addons that don't bring their own; `RUST_LOG` overrides the
//! configured level.

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::LogEncoding;
use crate::error::{Error, Result};

/// Parse one of "debug", "info", "warn" and "error".
pub fn parse_level(level: &str) -> Result<Level> {
    match level {
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(Error::LogLevel(other.to_string())),
    }
}

/// Install the global subscriber.
///
/// When a subscriber is already installed it is kept.
pub fn init(level: &str, encoding: LogEncoding) -> Result<()> {
    let level = parse_level(level)?;
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match encoding {
        LogEncoding::Console => builder.try_init(),
        LogEncoding::Json => builder.json().try_init(),
    };
    if let Err(e) = result {
        tracing::debug!(error = %e, "Keeping existing global subscriber");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_levels() {
        assert_eq!(parse_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_level("error").unwrap(), Level::ERROR);
    }

    #[test]
    fn unknown_level() {
        let err = parse_level("trace").unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"Unknown log level "trace" - only knows ["debug", "info", "warn", "error"]"#
        );
    }

    #[test]
    fn init_twice_is_fine() {
        init("info", LogEncoding::Console).unwrap();
        init("debug", LogEncoding::Json).unwrap();
        assert!(init("loud", LogEncoding::Console).is_err());
    }
}
