//! Logging setup for medaictl
//!
//! Everything goes to stderr; stdout belongs to the presenter.

use tracing_subscriber::EnvFilter;

/// Filter directives are read from this variable
pub const LOG_ENV: &str = "MEDAI_LOG";

/// Default directive when `MEDAI_LOG` is unset or unparseable
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    // A second init (tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
