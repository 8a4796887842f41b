//! Logging setup for binaries built on this crate.
//!
//! The library only emits `tracing` events. Installing a subscriber is left
//! to the binary; [`init`] is the one the bundled CLI uses.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "modelwiki=info";

/// Build the filter from `RUST_LOG`, falling back to `default`.
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install a stderr fmt subscriber. `verbose` raises the default filter to
/// `debug`. Returns false if a global subscriber was already set.
pub fn init(verbose: bool) -> bool {
    let default = if verbose { "modelwiki=debug" } else { DEFAULT_FILTER };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default))
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init()
        .is_ok()
}
