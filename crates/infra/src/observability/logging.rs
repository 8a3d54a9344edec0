//! Process-wide `tracing` subscriber setup

use daosync_domain::{DaoSyncError, LoggingConfig, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Install the global subscriber described by `config`
///
/// `RUST_LOG` takes precedence over `config.level`. Returns `Ok(false)` when
/// a global subscriber was already installed, so repeated calls are harmless.
///
/// # Errors
/// `DaoSyncError::Config` when `config.level` is not a valid filter directive.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool> {
    let filter = build_filter(config)?;

    let fmt_layer = if config.json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    let installed = tracing_subscriber::registry().with(filter).with(fmt_layer).try_init().is_ok();
    if installed {
        tracing::debug!(level = %config.level, json = config.json, "tracing initialised");
    }
    Ok(installed)
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(&config.level).map_err(|err| {
        DaoSyncError::Config(format!("invalid logging.level '{}': {err}", config.level))
    })
}
