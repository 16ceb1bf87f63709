//! ==============================================================================
//! logging.rs - tracing subscriber setup
//! ==============================================================================
//!
//! RUST_LOG wins when set; otherwise the `[logging] level` from host.toml
//! applies to this crate and tower_http, with everything else at warn.
//!
//! ==============================================================================

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// filter used when RUST_LOG is unset
pub fn default_directives(config: &LoggingConfig) -> String {
    let level = config.level.trim();
    format!("warn,sensor_host={level},tower_http={level}")
}

pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config)));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

/// run `f` with a plain info-level subscriber, for work that happens
/// before the configured subscriber exists (loading the config itself)
pub fn with_bootstrap_logger<T>(f: impl FnOnce() -> T) -> T {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("info"))
        .with_target(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f)
}
