use crate::engine::{EligibilityThresholds, EngineError, GuaranteeThreshold};
use std::env;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
///
/// Business rules are carried as values and handed to the engine explicitly; nothing
/// below this layer reads the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub guarantee: GuaranteeConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let ansi = match env::var("APP_LOG_ANSI") {
            Ok(raw) => matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
            Err(_) => environment == AppEnvironment::Development,
        };

        let defaults = EligibilityThresholds::default();
        let threshold = GuaranteeThreshold::new(read_f64(
            "GUARANTEE_THRESHOLD",
            GuaranteeThreshold::default().ratio(),
        )?)
        .map_err(|source| ConfigError::InvalidThreshold { source })?;
        let eligibility = EligibilityThresholds {
            min_active_hours_week: read_f64(
                "ELIGIBILITY_MIN_ACTIVE_HOURS",
                defaults.min_active_hours_week,
            )?,
            min_acceptance_rate: read_f64(
                "ELIGIBILITY_MIN_ACCEPTANCE_RATE",
                defaults.min_acceptance_rate,
            )?,
            max_cancellation_rate: read_f64(
                "ELIGIBILITY_MAX_CANCELLATION_RATE",
                defaults.max_cancellation_rate,
            )?,
            min_avg_rating: read_f64("ELIGIBILITY_MIN_RATING", defaults.min_avg_rating)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, ansi },
            guarantee: GuaranteeConfig {
                threshold,
                eligibility,
            },
        })
    }
}

fn read_f64(key: &'static str, default: f64) -> Result<f64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or(ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls. Colour output defaults on only in development.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

/// Guarantee policy: the payout ratio and the eligibility pass marks.
#[derive(Debug, Clone, Default)]
pub struct GuaranteeConfig {
    pub threshold: GuaranteeThreshold,
    pub eligibility: EligibilityThresholds,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost { source: std::net::AddrParseError },
    #[error("{key} must be a finite number")]
    InvalidNumber { key: &'static str },
    #[error("GUARANTEE_THRESHOLD rejected: {source}")]
    InvalidThreshold { source: EngineError },
}
