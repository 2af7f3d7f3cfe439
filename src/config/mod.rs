use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::drafts::LifecyclePolicy;
use chrono::Duration;

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
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub lifecycle: LifecyclePolicy,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            lifecycle: load_lifecycle()?,
        })
    }
}

fn load_lifecycle() -> Result<LifecyclePolicy, ConfigError> {
    let defaults = LifecyclePolicy::default();

    Ok(LifecyclePolicy {
        recovery_window: Duration::hours(positive_int(
            "DRAFT_RECOVERY_WINDOW_HOURS",
            defaults.recovery_window.num_hours(),
        )?),
        inactivity_window: Duration::days(positive_int(
            "DRAFT_INACTIVITY_WINDOW_DAYS",
            defaults.inactivity_window.num_days(),
        )?),
        cleanup_cadence: Duration::hours(positive_int(
            "DRAFT_CLEANUP_CADENCE_HOURS",
            defaults.cleanup_cadence.num_hours(),
        )?),
        batch_size: positive_count("DRAFT_CLEANUP_BATCH_SIZE", defaults.batch_size)?,
        max_batches_per_run: positive_count(
            "DRAFT_CLEANUP_MAX_BATCHES",
            defaults.max_batches_per_run,
        )?,
        active_display_cap: positive_count("DRAFT_ACTIVE_DISPLAY_CAP", defaults.active_display_cap)?,
    })
}

fn positive_int(var: &'static str, default: i64) -> Result<i64, ConfigError> {
    match env::var(var) {
        Ok(raw) => match raw.trim().parse::<i64>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(ConfigError::InvalidLifecycleValue { var }),
        },
        Err(_) => Ok(default),
    }
}

fn positive_count(var: &'static str, default: usize) -> Result<usize, ConfigError> {
    match env::var(var) {
        Ok(raw) => match raw.trim().parse::<usize>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(ConfigError::InvalidLifecycleValue { var }),
        },
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLifecycleValue { var: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLifecycleValue { var } => {
                write!(f, "{var} must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidLifecycleValue { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
