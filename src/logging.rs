//! Logging initialization.
//!
//! Log lines go to stdout through `tracing-subscriber`, either human-readable
//! or as JSON. `RUST_LOG` overrides the level picked from the flags.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init(verbose: bool, json_format: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stdout))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stdout)
                    .with_ansi(true),
            )
            .init();
    }
}
