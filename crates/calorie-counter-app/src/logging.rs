//! Structured logging setup.
//!
//! Free-form text is scrubbed with [`redact_sensitive`] before it is logged.

pub use calorie_counter_core::redact_sensitive;
use tracing_subscriber::{EnvFilter, fmt};

use crate::AppError;

/// Installs the global `fmt` subscriber writing to stderr.
///
/// `filter` uses `EnvFilter` directive syntax, e.g. `info` or
/// `calorie_counter_app=debug`.
///
/// # Errors
/// Returns [`AppError::Logging`] for an invalid directive or when a global
/// subscriber is already installed.
pub fn init_logging(filter: &str) -> Result<(), AppError> {
    let filter = EnvFilter::try_new(filter).map_err(|error| AppError::Logging(error.to_string()))?;
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|error| AppError::Logging(error.to_string()))
}

