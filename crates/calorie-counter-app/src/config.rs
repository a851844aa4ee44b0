//! Runtime configuration.
//!
//! Values come from defaults, then the environment, then CLI overrides.

use std::sync::Arc;
use std::time::Duration;

use calorie_counter_transport::{
    DEFAULT_REQUEST_TIMEOUT, HttpTransport, ServiceEndpoints, ServiceTransport, TransportError,
    validate_service_base,
};
use thiserror::Error;

/// Env var holding the service base URL.
pub const API_BASE_ENV: &str = "CALORIE_COUNTER_API_BASE";
/// Env var holding the per-request timeout in seconds.
pub const TIMEOUT_SECS_ENV: &str = "CALORIE_COUNTER_TIMEOUT_SECS";
/// Env var holding the log filter.
pub const LOG_FILTER_ENV: &str = "RUST_LOG";

/// Service base used when nothing is configured.
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";
/// Log filter used when nothing is configured.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Service base URL.
    pub api_base: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// `tracing` filter directive.
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    /// See [`AppConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// Blank values are treated as unset.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidTimeout`] for a non-numeric or zero
    /// timeout and [`ConfigError::InvalidApiBase`] for a base URL that fails
    /// endpoint policy.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(base) = read(API_BASE_ENV) {
            config.api_base = base;
        }
        if let Some(raw) = read(TIMEOUT_SECS_ENV) {
            config.request_timeout = parse_timeout_secs(&raw)?;
        }
        if let Some(filter) = read(LOG_FILTER_ENV) {
            config.log_filter = filter;
        }

        config.validate()?;
        Ok(config)
    }

    /// Applies CLI overrides on top of the loaded values.
    ///
    /// # Errors
    /// Same validation as [`AppConfig::from_lookup`].
    pub fn with_overrides(
        mut self,
        api_base: Option<String>,
        timeout_secs: Option<u64>,
        log_filter: Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(base) = api_base {
            self.api_base = base;
        }
        if let Some(secs) = timeout_secs {
            self.request_timeout = timeout_from_secs(secs)?;
        }
        if let Some(filter) = log_filter {
            self.log_filter = filter;
        }

        self.validate()?;
        Ok(self)
    }

    /// Resolves the endpoint URLs.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidApiBase`] when the base fails policy.
    pub fn endpoints(&self) -> Result<ServiceEndpoints, ConfigError> {
        ServiceEndpoints::new(&self.api_base).map_err(ConfigError::InvalidApiBase)
    }

    /// Builds the blocking HTTP transport.
    ///
    /// # Errors
    /// Returns [`ConfigError::Transport`] when the client cannot be built.
    pub fn build_transport(&self) -> Result<Arc<dyn ServiceTransport>, ConfigError> {
        let transport = HttpTransport::new(self.request_timeout).map_err(ConfigError::Transport)?;
        Ok(Arc::new(transport))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_service_base(&self.api_base).map_err(ConfigError::InvalidApiBase)?;
        Ok(())
    }
}

fn parse_timeout_secs(raw: &str) -> Result<Duration, ConfigError> {
    let secs = raw
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidTimeout(raw.to_string()))?;
    timeout_from_secs(secs)
}

fn timeout_from_secs(secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::InvalidTimeout(secs.to_string()));
    }
    Ok(Duration::from_secs(secs))
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Base URL fails endpoint policy.
    #[error("invalid CALORIE_COUNTER_API_BASE: {0}")]
    InvalidApiBase(TransportError),
    /// Timeout is not a positive integer number of seconds.
    #[error("invalid CALORIE_COUNTER_TIMEOUT_SECS: {0:?} (expected a positive number of seconds)")]
    InvalidTimeout(String),
    /// HTTP transport could not be built.
    #[error("cannot build transport: {0}")]
    Transport(TransportError),
}
