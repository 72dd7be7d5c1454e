//! Server configuration and environment profile
//!
//! Settings are read from `TRELLIS_`-prefixed environment variables through
//! `envy`, optionally after loading a `.env` file with `dotenvy`:
//!
//! ```text
//! TRELLIS_HOST=0.0.0.0
//! TRELLIS_PORT=8080
//! TRELLIS_BODY_LIMIT=1048576
//! TRELLIS_REQUEST_TIMEOUT_MS=30000
//! TRELLIS_LOG_LEVEL=info
//! TRELLIS_ENV=production
//! ```
//!
//! Every field has a default, so an empty environment yields a usable config.

use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Prefix of every environment variable read by this module.
pub const ENV_PREFIX: &str = "TRELLIS_";

/// Default maximum request body size (1 MiB)
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Error type for configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Env(#[from] envy::Error),

    #[error("invalid listen address '{0}'")]
    InvalidAddr(String),
}

/// Environment profile for the application.
///
/// Detected from the `TRELLIS_ENV` environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Verbose error bodies.
    Development,
    /// Internal error details are masked.
    Production,
    /// Custom environment name, treated like development.
    Custom(String),
}

impl Environment {
    /// Detect the environment from `TRELLIS_ENV`.
    ///
    /// `production`/`prod` and `development`/`dev` are recognised, an unset
    /// variable means development.
    pub fn current() -> Self {
        match std::env::var("TRELLIS_ENV") {
            Ok(value) => Self::parse(&value),
            Err(_) => Self::Development,
        }
    }

    fn parse(value: &str) -> Self {
        match value {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Whether internal error details may be included in responses.
    pub fn show_error_details(&self) -> bool {
        !self.is_production()
    }

    /// Default log filter for this environment.
    pub fn default_log_level(&self) -> &'static str {
        match self {
            Self::Development => "debug",
            Self::Production | Self::Custom(_) => "info",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The process-wide environment, read once on first use.
pub fn environment() -> &'static Environment {
    static ENV: OnceLock<Environment> = OnceLock::new();
    ENV.get_or_init(Environment::current)
}

/// Settings for the bundled hyper server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum request body size in bytes.
    pub body_limit: usize,
    /// Per-request timeout in milliseconds. `0` disables the timeout.
    pub request_timeout_ms: u64,
    /// `tracing_subscriber::EnvFilter` directive used by `init_tracing`.
    pub log_level: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            body_limit: DEFAULT_BODY_LIMIT,
            request_timeout_ms: 30_000,
            log_level: None,
        }
    }
}

impl ServerConfig {
    /// Load from `TRELLIS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_prefixed(ENV_PREFIX)
    }

    /// Load from environment variables starting with `prefix`.
    pub fn from_env_prefixed(prefix: &str) -> Result<Self, ConfigError> {
        Ok(envy::prefixed(prefix).from_env::<Self>()?)
    }

    /// Load a `.env` file if present, then read the environment.
    pub fn load() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_env()
    }

    /// The socket address to bind.
    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddr(addr))
    }

    /// The request timeout, if enabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }

    /// Log filter, falling back to the environment's default level.
    pub fn log_filter(&self) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| environment().default_log_level().to_string())
    }
}

/// Load environment variables from a `.env` file in the current directory.
///
/// A missing file is not an error and existing variables are not overridden.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("prod"), Environment::Production);
        assert_eq!(Environment::parse("development"), Environment::Development);
        assert_eq!(
            Environment::parse("staging"),
            Environment::Custom("staging".to_string())
        );
        assert!(!Environment::Production.show_error_details());
        assert!(Environment::Custom("staging".to_string()).show_error_details());
    }

    #[test]
    fn test_defaults_from_empty_environment() {
        let config = ServerConfig::from_env_prefixed("TRELLIS_TEST_EMPTY_").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_prefixed_overrides() {
        std::env::set_var("TRELLIS_TEST_CFG_PORT", "9191");
        std::env::set_var("TRELLIS_TEST_CFG_REQUEST_TIMEOUT_MS", "0");
        std::env::set_var("TRELLIS_TEST_CFG_LOG_LEVEL", "trellis=trace");

        let config = ServerConfig::from_env_prefixed("TRELLIS_TEST_CFG_").unwrap();
        assert_eq!(config.port, 9191);
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.log_filter(), "trellis=trace");
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn test_invalid_value_is_an_error() {
        std::env::set_var("TRELLIS_TEST_BAD_PORT", "not-a-port");
        assert!(matches!(
            ServerConfig::from_env_prefixed("TRELLIS_TEST_BAD_"),
            Err(ConfigError::Env(_))
        ));
    }

    #[test]
    fn test_invalid_addr() {
        let config = ServerConfig {
            host: "not a host".to_string(),
            ..ServerConfig::default()
        };
        assert!(matches!(config.addr(), Err(ConfigError::InvalidAddr(_))));
    }
}
