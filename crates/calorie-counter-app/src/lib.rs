#![warn(missing_docs)]
//! # calorie-counter-app
//!
//! ## Purpose
//! Wires the submission machine, preview slot, wire contract and transport into
//! the two controllers of `calorie-counter`.
//!
//! ## Responsibilities
//! - Own the pending input of each workflow and gate its mutation on status.
//! - Run remote calls inline or on a named worker thread, applying exactly one
//!   terminal transition per attempt.
//! - Load configuration from the environment and install structured logging.
//!
//! ## Data flow
//! User action -> controller -> [`dispatch::SubmissionDriver`] -> transport ->
//! contract interpretation -> state transition -> UI projection.
//!
//! ## Ownership and lifetimes
//! Each controller exclusively owns its machine and preview slot. Worker
//! threads receive owned requests and a ticket; they never borrow controller
//! state.
//!
//! ## Error model
//! Submission outcomes land in the controller state as messages. Operational
//! failures (busy controller, worker spawn, config, logging) are returned as
//! [`AppError`].
//!
//! ## Security and privacy notes
//! - Passphrases and request bodies are never logged.
//! - [`redact_sensitive`] scrubs secret-looking values from free-form text.

pub mod analysis;
pub mod config;
pub mod dispatch;
pub mod logging;
pub mod transform;

use calorie_counter_contract::ContractError;
use calorie_counter_core::SubmissionError;
use calorie_counter_preview::PreviewError;
use calorie_counter_transport::TransportError;
use thiserror::Error;

pub use analysis::AnalysisController;
pub use config::{AppConfig, ConfigError};
pub use dispatch::SubmissionDriver;
pub use logging::{init_logging, redact_sensitive};
pub use transform::TransformController;

/// Package version reported by the CLI.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the package version.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Submission failed validation before any request.
    #[error("submission error: {0}")]
    Submission(#[from] SubmissionError),
    /// Preview store error.
    #[error("preview error: {0}")]
    Preview(#[from] PreviewError),
    /// Transport construction or endpoint error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// Wire contract error.
    #[error("contract error: {0}")]
    Contract(#[from] ContractError),
    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Pending input cannot change while a submission is in flight.
    #[error("a submission is already in flight")]
    Busy,
    /// Background worker could not be started.
    #[error("worker error: {0}")]
    Worker(String),
    /// Logging could not be initialized.
    #[error("logging error: {0}")]
    Logging(String),
}
