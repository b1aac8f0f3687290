use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Installs the stderr subscriber. `RUST_LOG` takes precedence over the
/// configured level; a second call is a no-op.
pub fn init_logging(config: &LoggingConfig) {
    if tracing::dispatcher::has_been_set() {
        return;
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    fmt()
        .with_env_filter(env_filter)
        .with_target(config.with_target)
        .with_writer(std::io::stderr)
        .init();
}
