use crate::scoring::{EncoderSettings, UnknownCategoryPolicy};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

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
    pub artifacts: ArtifactConfig,
    pub encoder: EncoderSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let directory = env::var("APP_ARTIFACT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(ArtifactConfig::DEFAULT_DIR));

        let defaults = EncoderSettings::default();
        let smoothing = parse_float("APP_ENCODER_SMOOTHING", defaults.smoothing)?;
        if smoothing <= 0.0 {
            return Err(ConfigError::InvalidNumber {
                key: "APP_ENCODER_SMOOTHING",
            });
        }
        let min_samples_leaf =
            parse_float("APP_ENCODER_MIN_SAMPLES_LEAF", defaults.min_samples_leaf)?;

        let policy_override = match env::var("APP_UNKNOWN_CATEGORY_POLICY") {
            Ok(raw) => Some(
                raw.parse::<UnknownCategoryPolicy>()
                    .map_err(|_| ConfigError::InvalidUnknownCategoryPolicy(raw))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            artifacts: ArtifactConfig {
                directory,
                unknown_category: policy_override,
            },
            encoder: EncoderSettings {
                smoothing,
                min_samples_leaf,
                unknown_category: policy_override.unwrap_or(defaults.unknown_category),
            },
        })
    }
}

fn parse_float(key: &'static str, default: f64) -> Result<f64, ConfigError> {
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Location of the serialized encoder and model.
#[derive(Debug, Clone)]
pub struct ArtifactConfig {
    pub directory: PathBuf,
    /// Set only when `APP_UNKNOWN_CATEGORY_POLICY` is present; replaces the
    /// policy stored in `encoder.json` when artifacts are loaded.
    pub unknown_category: Option<UnknownCategoryPolicy>,
}

impl ArtifactConfig {
    pub const DEFAULT_DIR: &'static str = "model";
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    InvalidUnknownCategoryPolicy(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a finite positive number")
            }
            ConfigError::InvalidUnknownCategoryPolicy(value) => write!(
                f,
                "APP_UNKNOWN_CATEGORY_POLICY must be 'mean' or 'reject' (got '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidUnknownCategoryPolicy(_) => None,
        }
    }
}
