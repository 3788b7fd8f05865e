//! Tracing subscriber setup for binaries and demos

use crate::{Error, Result};
use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter` (e.g. `"info"`) when the variable is unset.
///
/// # Errors
///
/// Returns error if a global subscriber is already installed
pub fn init_tracing(default_filter: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| Error::Other(format!("tracing subscriber already set: {e}")))
}
