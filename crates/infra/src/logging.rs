use crate::config::AppConfig;
use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt};

/// Falls back to `info` when `log_level` is not a valid filter directive.
fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init_tracing(config: &AppConfig) -> Result<()> {
    let subscriber = fmt().with_env_filter(env_filter(&config.log_level));

    if config.is_production() {
        subscriber
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(false)
            .try_init()
            .map_err(|err| anyhow::anyhow!(err))
            .context("installing json tracing subscriber")?;
    } else {
        subscriber
            .compact()
            .with_target(true)
            .try_init()
            .map_err(|err| anyhow::anyhow!(err))
            .context("installing compact tracing subscriber")?;
    }

    tracing::debug!(
        app_env = %config.app_env,
        data_backend = %config.data_backend,
        log_level = %config.log_level,
        "tracing initialized"
    );
    Ok(())
}
