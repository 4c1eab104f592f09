//! Tracing setup for the CLI and embedders.
//!
//! Verbosity comes from the `-v` count; an explicit `RUST_LOG` or config
//! filter always wins. This is diagnostic logging only. The minter's
//! append-only `log` file inside each database directory is part of the
//! persisted-state contract and is written separately.

use tracing_subscriber::EnvFilter;

use crate::config::Settings;

fn filter_for(verbosity: u8, settings: &Settings) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    if let Some(filter) = &settings.logging.filter
        && let Ok(filter) = EnvFilter::try_new(filter)
    {
        return filter;
    }
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::new(format!("noid_rs={level},noid={level}"))
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are no-ops (tests initialize per-process).
pub fn init(verbosity: u8, settings: &Settings) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbosity, settings))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
