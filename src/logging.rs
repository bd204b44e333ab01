//! Tracing subscriber setup for binaries embedding the engine.

use tracing_subscriber::{EnvFilter, fmt, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    AgentflowError, Result,
    config::{LogConfig, LogFormat},
};

/// Install a global subscriber. `RUST_LOG` takes precedence over `config.level`.
///
/// Fails when a global subscriber is already set.
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::registry().with(filter).with(fmt::layer().json().with_span_events(FmtSpan::CLOSE)).try_init(),
        LogFormat::Pretty => tracing_subscriber::registry().with(filter).with(fmt::layer().pretty().with_target(true).with_span_events(FmtSpan::CLOSE)).try_init(),
    };
    installed.map_err(|e| AgentflowError::Engine(format!("failed to install tracing subscriber: {}", e)))?;

    tracing::info!("logging initialized with level: {}", config.level);
    Ok(())
}
