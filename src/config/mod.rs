//! # Configuration
//!
//! Operator configuration loaded from environment variables.
//!
//! All settings have defaults; deployments override them through `env`/`envFrom`.

mod controller;
mod duration;
mod server;

pub use controller::ControllerConfig;
pub use duration::parse_kubernetes_duration;
pub use server::ServerConfig;

/// Load configuration from environment variables with defaults
///
/// # Errors
///
/// Returns an error when a duration variable is set but malformed.
pub fn load_config() -> anyhow::Result<(ControllerConfig, ServerConfig)> {
    Ok((ControllerConfig::from_env()?, ServerConfig::from_env()))
}

/// Read environment variable or return default value
pub(crate) fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
