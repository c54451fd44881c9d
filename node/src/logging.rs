//! Process-wide `tracing` subscriber.

use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directives. `RUST_LOG`, when set, takes precedence.
    pub level: String,
    /// Colour output.
    pub ansi: bool,
    /// Include the emitting module in each line.
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_owned(), ansi: true, with_target: true }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    #[error("installing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Build the filter for `cfg`.
pub fn env_filter(cfg: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(&cfg.level)?),
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(cfg: &LoggingConfig) -> Result<(), LoggingError> {
    let fmt_layer = tracing_subscriber::fmt::layer().with_ansi(cfg.ansi).with_target(cfg.with_target);
    tracing_subscriber::registry().with(env_filter(cfg)?).with(fmt_layer).try_init()?;
    Ok(())
}

/* --------------------------------- Tests -------------------------------- */
