use std::env;
use std::io::{IsTerminal, stderr};
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
///
/// Logs go to stderr so that command output on stdout stays clean. A terminal
/// gets human-readable lines, anything else gets JSON.
pub fn setup_logging() {
    let is_terminal = stderr().is_terminal();
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    if is_terminal {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(stderr)
            .with_ansi(true)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(stderr)
            .with_ansi(false)
            .with_target(true)
            .init();
    }
    tracing::debug!("logging initialized with level: {:?}", log_level);
}
