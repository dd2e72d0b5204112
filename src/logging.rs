//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins over `logging.level` from `media.toml`. Logs go to stderr
//! so command output on stdout (tags, srcsets, generated config) stays
//! pipeable.

use crate::config::LoggingConfig;
use tracing_subscriber::{EnvFilter, fmt};

/// Build the filter: `RUST_LOG` if set and valid, else the configured level.
fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install the global tracing subscriber. A second call is a no-op.
pub fn init_logging(config: &LoggingConfig) {
    let filter = env_filter(config);

    if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}
