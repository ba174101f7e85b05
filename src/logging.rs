//! Log output for the command-line tool.

use std::env;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable that overrides the log filter, e.g. `packrat=trace`.
pub const LOG_ENV: &str = "PACKRAT_LOG";

/// Installs a stderr subscriber. `verbose` selects `debug`, otherwise `info`.
///
/// Calling this twice is harmless; the second call leaves the first
/// subscriber in place.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = env::var(LOG_ENV).unwrap_or_else(|_| default_level.to_string());

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time()
                .with_ansi(true),
        )
        .with(EnvFilter::new(filter))
        .try_init();
}
