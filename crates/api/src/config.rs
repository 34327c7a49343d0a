//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CARTAGE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `CARTAGE_HOST` - Bind address (default: 127.0.0.1)
//! - `CARTAGE_PORT` - Listen port (default: 8080)
//! - `CARTAGE_CURRENCY` - Order currency (default: IDR)
//! - `CARTAGE_DEFAULT_PROVIDER` - Provider used when initiation names none (default: manual)
//! - `CARTAGE_REQUEST_TIMEOUT_SECS` - Per-request deadline (default: 15)
//! - `CARTAGE_ID_RETRY_ATTEMPTS` - Attempts at a unique random reference (default: 5, 1-20)
//! - `CARTAGE_DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `CARTAGE_LOG_FORMAT` - `text` or `json` (default: text)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use cartage_core::{CurrencyCode, ProviderName};
use secrecy::SecretString;
use thiserror::Error;

const MAX_ID_RETRY_ATTEMPTS: u32 = 20;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `text` or `json`, got `{other}`")),
        }
    }
}

/// Checkout behaviour shared by the services.
///
/// Split from [`ApiConfig`] so services and tests can be built without a
/// database URL.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// Currency stamped on every new order
    pub currency: CurrencyCode,
    /// Provider used when a payment initiation names none
    pub default_provider: ProviderName,
    /// How many random references to try before giving up
    pub id_retry_attempts: u32,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            currency: CurrencyCode::default(),
            default_provider: ProviderName::manual(),
            id_retry_attempts: 5,
        }
    }
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Maximum pool connections
    pub db_max_connections: u32,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Deadline applied to every request
    pub request_timeout: Duration,
    /// Log output format
    pub log_format: LogFormat,
    /// Checkout and payment settings
    pub checkout: CheckoutSettings,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("CARTAGE_DATABASE_URL")?;
        let db_max_connections = parse_env("CARTAGE_DB_MAX_CONNECTIONS", "10")?;
        let host = parse_env::<IpAddr>("CARTAGE_HOST", "127.0.0.1")?;
        let port = parse_env::<u16>("CARTAGE_PORT", "8080")?;
        let request_timeout =
            Duration::from_secs(parse_env::<u64>("CARTAGE_REQUEST_TIMEOUT_SECS", "15")?);
        let log_format = parse_env::<LogFormat>("CARTAGE_LOG_FORMAT", "text")?;

        let currency = parse_env::<CurrencyCode>("CARTAGE_CURRENCY", "IDR")?;
        let default_provider =
            parse_env::<ProviderName>("CARTAGE_DEFAULT_PROVIDER", ProviderName::MANUAL)?;
        let id_retry_attempts = parse_env::<u32>("CARTAGE_ID_RETRY_ATTEMPTS", "5")?;
        validate_retry_attempts(id_retry_attempts)?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            database_url,
            db_max_connections,
            host,
            port,
            request_timeout,
            log_format,
            checkout: CheckoutSettings {
                currency,
                default_provider,
                id_retry_attempts,
            },
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn validate_retry_attempts(attempts: u32) -> Result<(), ConfigError> {
    if attempts == 0 || attempts > MAX_ID_RETRY_ATTEMPTS {
        return Err(ConfigError::InvalidEnvVar(
            "CARTAGE_ID_RETRY_ATTEMPTS".to_string(),
            format!("must be between 1 and {MAX_ID_RETRY_ATTEMPTS} (got {attempts})"),
        ));
    }
    Ok(())
}
