//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! Logs go to stderr so that rosters and reports printed on stdout stay
//! machine-readable. `RUST_LOG` takes precedence over the CLI verbosity.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Map `-v`/`-q` counts onto a level, starting from `warn`.
pub fn level_for(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

pub fn init_logging(level: Level) -> anyhow::Result<()> {
    let level = level.as_str().to_ascii_lowercase();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("campus_roster={level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))
}
