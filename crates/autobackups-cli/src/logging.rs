//! Log output on stderr

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding a log filter, e.g. `autobackups_core=debug`
pub const LOG_ENV: &str = "AUTOBACKUPS_LOG";

/// Install the global subscriber
///
/// The filter comes from [`LOG_ENV`] when set, otherwise `debug` with
/// `--verbose` and `warn` without.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    // A subscriber may already be installed when embedded; keep it.
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
