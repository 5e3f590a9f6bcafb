//! Logging setup.
//!
//! Diagnostics go to stderr through the tracing ecosystem so stdout stays
//! clean for piped output. `RUST_LOG` overrides the verbosity flags.

use tracing_subscriber::EnvFilter;

/// Map repeated `-v` flags to a default filter level.
fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initialize the global tracing subscriber.
///
/// Safe to call more than once; a subscriber already installed (for
/// example by an integration test harness) is left in place.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
