//! Subscriber setup for the binary. The library only emits events.

use tracing_subscriber::EnvFilter;

use crate::config::{Config, LogFormat};

/// Environment variable overriding the configured filter.
pub const LOG_ENV: &str = "ITDGEN_LOG";

/// Filter used when neither the environment nor the config names one.
const DEFAULT_FILTER: &str = "warn";

/// Install a stderr subscriber. `ITDGEN_LOG` wins over `log_level`; an
/// unparsable directive falls back to the default. Calling twice is a no-op.
pub fn init(config: &Config) {
    let filter = filter(std::env::var(LOG_ENV).ok().as_deref(), config.log_level.as_deref());
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false);
    let installed = match config.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.compact().try_init(),
    };
    if installed.is_err() {
        tracing::trace!("subscriber already installed");
    }
}

/// The effective filter from the environment value and the configured level.
fn filter(env: Option<&str>, configured: Option<&str>) -> EnvFilter {
    let directive = env.filter(|d| return !d.trim().is_empty()).or(configured).unwrap_or(DEFAULT_FILTER);
    return EnvFilter::try_new(directive).unwrap_or_else(|_err| return EnvFilter::new(DEFAULT_FILTER));
}
