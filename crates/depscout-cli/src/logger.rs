//! Logging setup for the depscout CLI.
//!
//! The level is chosen in this order:
//! 1. `--verbose`: debug for the depscout crates
//! 2. `--quiet`: errors only
//! 3. `RUST_LOG`
//! 4. info for the depscout crates
//!
//! Logs go to stderr so that stdout carries only the analysis output.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "depscout=debug,depscout_cli=debug";
const QUIET_FILTER: &str = "depscout=error,depscout_cli=error";
const DEFAULT_FILTER: &str = "depscout=info,depscout_cli=info";

/// Initialize the global tracing subscriber.
///
/// Call once, before any logging occurs.
///
/// ```rust,no_run
/// use depscout_cli::logger::init_logger;
///
/// // Debug logging without colors
/// init_logger(true, false, true);
/// ```
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(filter_for(verbose, quiet), no_color);
}

/// Initialize logging with an explicit filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}
