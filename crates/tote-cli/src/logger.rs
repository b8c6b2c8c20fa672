//! Logging setup for the tote CLI.
//!
//! The library crates only emit `tracing` events; this module installs the
//! subscriber that prints them.
//!
//! The filter is chosen in this order:
//! 1. `--verbose`: debug for the tote crates
//! 2. `--quiet`: errors only
//! 3. `RUST_LOG`
//! 4. info for the tote crates
//!
//! ```rust,no_run
//! use tote_cli::logger::init_logger;
//!
//! init_logger(false, false, false);
//! tracing::info!("starting build");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_DIRECTIVES: &str = "tote_cli=debug,tote_bundler=debug,tote_graph=debug,tote_config=debug";
const QUIET_DIRECTIVES: &str = "error";
const DEFAULT_DIRECTIVES: &str = "tote_cli=info,tote_bundler=info,tote_graph=info,tote_config=info";

/// Install the global `tracing` subscriber. Call once, before any logging.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(filter_for(verbose, quiet), no_color);
}

/// Install the global subscriber with an explicit filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && should_use_colors())
        .compact();

    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    match flag_directives(verbose, quiet) {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES)),
    }
}

/// Directives forced by command-line flags, if any.
fn flag_directives(verbose: bool, quiet: bool) -> Option<&'static str> {
    if verbose {
        Some(VERBOSE_DIRECTIVES)
    } else if quiet {
        Some(QUIET_DIRECTIVES)
    } else {
        None
    }
}

/// Whether stderr should get ANSI colors.
///
/// `NO_COLOR` disables colors, `FORCE_COLOR` enables them, otherwise the
/// terminal decides.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::Term::stderr().features().colors_supported()
}
