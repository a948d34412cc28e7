//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `PASSPORT_HOST` - Bind address (default: 127.0.0.1)
//! - `PASSPORT_PORT` - Listen port (default: 3000)
//! - `PASSPORT_BASE_URL` - Public URL (default: <http://localhost:3000>)
//! - `PASSPORT_APP_NAMESPACE` - Record store namespace (default: sake-8a8e4)
//! - `PASSPORT_STORE` - `memory` or `postgres` (default: `postgres` when a
//!   database URL is set, `memory` otherwise)
//! - `PASSPORT_DATABASE_URL` - `PostgreSQL` connection string, falls back to
//!   `DATABASE_URL`
//! - `PASSPORT_SESSION_IDLE_MINUTES` - Idle minutes before a passport's live
//!   subscription is torn down (default: 120)
//! - `PASSPORT_MAX_SESSIONS` - Live passport sessions kept at once; the least
//!   recently used are evicted beyond it (default: 10000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0 to 1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Trace sample rate, 0.0 to 1.0 (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

/// Default record store namespace.
pub const DEFAULT_APP_NAMESPACE: &str = "sake-8a8e4";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Which record store backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local store. Passports are lost on restart.
    Memory,
    /// `PostgreSQL` with `LISTEN`/`NOTIFY` change feeds.
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(format!("unknown store backend '{other}'")),
        }
    }
}

/// Web server configuration.
#[derive(Debug, Clone)]
pub struct PassportConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Namespace prefix for every record store path
    pub app_namespace: String,
    /// Record store backend
    pub store: StoreBackend,
    /// `PostgreSQL` connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// Idle time before a passport session context is evicted
    pub session_idle: Duration,
    /// Most passport session contexts kept at once
    pub max_sessions: u64,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry trace sample rate
    pub sentry_traces_sample_rate: f32,
}

impl PassportConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value, or if
    /// the `postgres` backend is requested without a database URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("PASSPORT_HOST", "127.0.0.1")?;
        let port = parse_env("PASSPORT_PORT", "3000")?;
        let base_url = get_env_or_default("PASSPORT_BASE_URL", "http://localhost:3000");
        let app_namespace = get_env_or_default("PASSPORT_APP_NAMESPACE", DEFAULT_APP_NAMESPACE);
        let database_url = get_database_url("PASSPORT_DATABASE_URL");

        let store = match get_optional_env("PASSPORT_STORE") {
            Some(value) => value
                .parse::<StoreBackend>()
                .map_err(|e| ConfigError::InvalidEnvVar("PASSPORT_STORE".to_string(), e))?,
            None if database_url.is_some() => StoreBackend::Postgres,
            None => StoreBackend::Memory,
        };
        if store == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnvVar(
                "PASSPORT_DATABASE_URL".to_string(),
            ));
        }

        let idle_minutes: u64 = parse_env("PASSPORT_SESSION_IDLE_MINUTES", "120")?;
        if idle_minutes == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "PASSPORT_SESSION_IDLE_MINUTES".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let max_sessions: u64 = parse_env("PASSPORT_MAX_SESSIONS", "10000")?;
        if max_sessions == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "PASSPORT_MAX_SESSIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            host,
            port,
            base_url,
            app_namespace,
            store,
            database_url,
            session_idle: Duration::from_secs(idle_minutes * 60),
            max_sessions,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_sample_rate("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_sample_rate("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// In-memory configuration with defaults, for tests and local tooling.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            app_namespace: DEFAULT_APP_NAMESPACE.to_string(),
            store: StoreBackend::Memory,
            database_url: None,
            session_idle: Duration::from_secs(120 * 60),
            max_sessions: 10_000,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the site is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    get_optional_env(primary_key)
        .or_else(|| get_optional_env("DATABASE_URL"))
        .map(SecretString::from)
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a Sentry sample rate and check it lies in `0.0..=1.0`.
fn parse_sample_rate(key: &str, default: &str) -> Result<f32, ConfigError> {
    let rate: f32 = parse_env(key, default)?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("{rate} is outside 0.0..=1.0"),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert_eq!(
            " Postgres ".parse::<StoreBackend>(),
            Ok(StoreBackend::Postgres)
        );
        assert!("redis".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_in_memory_defaults() {
        let config = PassportConfig::in_memory();
        assert_eq!(config.app_namespace, "sake-8a8e4");
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.max_sessions, 10_000);
        assert!(!config.is_secure());
    }

    #[test]
    fn test_socket_addr() {
        let config = PassportConfig {
            port: 8080,
            ..PassportConfig::in_memory()
        };
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn test_is_secure() {
        let config = PassportConfig {
            base_url: "https://passport.example.org".to_string(),
            ..PassportConfig::in_memory()
        };
        assert!(config.is_secure());
    }

    #[test]
    fn test_parse_env_default_used_when_unset() {
        let port: u16 = parse_env("PASSPORT_TEST_UNSET_PORT", "4321").unwrap();
        assert_eq!(port, 4321);
    }

    #[test]
    fn test_parse_env_invalid_default_reports_key() {
        let err = parse_env::<u16>("PASSPORT_TEST_UNSET_PORT", "not-a-port").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "PASSPORT_TEST_UNSET_PORT"));
    }

    #[test]
    fn test_sample_rate_bounds() {
        assert!(parse_sample_rate("PASSPORT_TEST_UNSET_RATE", "0.5").is_ok());
        assert!(parse_sample_rate("PASSPORT_TEST_UNSET_RATE", "1.5").is_err());
    }
}
