//! Tracing initialization for embedding applications.

use tracing_subscriber::EnvFilter;

/// Initializes the tracing subscriber with the given default log level.
///
/// `RUST_LOG` takes precedence when set. Call once at process start.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
