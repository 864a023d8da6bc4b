//! Helpers for logging

pub use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Map the number of `-v` flags to a default log level
pub fn level_for_verbosity(verbosity: u64) -> LevelFilter {
  match verbosity {
    0 => LevelFilter::INFO,
    1 => LevelFilter::DEBUG,
    _ => LevelFilter::TRACE,
  }
}

/// Initialize a stderr logger at the given level, `RUST_LOG` takes precedence
pub fn setup_logger(level: LevelFilter) {
  let filter = EnvFilter::builder()
    .with_default_directive(level.into())
    .from_env_lossy();

  // A subscriber may already be installed when running inside tests
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .try_init();
}
