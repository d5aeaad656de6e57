//! Tracing subscriber setup for binaries and tests.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a global fmt subscriber filtered by `log_level` (or `RUST_LOG`)
///
/// An unparsable filter falls back to `info`. Returns an error message when a
/// global subscriber is already installed.
pub fn init_tracing(log_level: &str) -> Result<(), String> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .try_init()
        .map_err(|err| format!("failed to install tracing subscriber: {err}"))
}
