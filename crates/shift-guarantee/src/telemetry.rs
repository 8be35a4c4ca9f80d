use crate::config::TelemetryConfig;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("APP_LOG_LEVEL '{value}' is not a valid tracing filter")]
    EnvFilter { value: String, source: ParseError },
    #[error("tracing subscriber already installed: {0}")]
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

/// Filter for engine and ledger events. `RUST_LOG` takes precedence when set.
fn shift_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.log_level).map_err(|source| TelemetryError::EnvFilter {
        value: config.log_level.clone(),
        source,
    })
}

pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    tracing_subscriber::fmt()
        .with_env_filter(shift_filter(config)?)
        .with_target(false)
        .compact()
        .with_ansi(config.ansi)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}
