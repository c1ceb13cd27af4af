//! Cross-cutting middleware.

pub mod cors;
pub(crate) mod custom;
pub(crate) mod logging;
pub(crate) mod meta;
pub mod metrics;
