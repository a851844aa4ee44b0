#![warn(missing_docs)]
//! # calorie-counter-core
//!
//! ## Purpose
//! Defines the submission state machine shared by the analysis and transform
//! controllers of `calorie-counter`.
//!
//! ## Responsibilities
//! - Represent the `Idle | Loading | Success | Error` lifecycle as one tagged
//!   union so status, result and error message always change together.
//! - Guard against overlapping submissions from one controller.
//! - Carry a liveness token with every in-flight attempt so late completions
//!   after teardown are dropped.
//! - Normalize failed responses and local errors into one non-empty,
//!   user-facing message.
//!
//! ## Data flow
//! Controller action -> [`SubmissionMachine::begin`] hands out a [`Ticket`] ->
//! the remote call runs -> [`SubmissionMachine::complete`] applies the outcome
//! if the ticket is still current and live.
//!
//! ## Ownership and lifetimes
//! Results and messages are owned values. A [`Ticket`] only shares the
//! liveness flag with its machine, so it can travel to a worker thread without
//! borrowing controller state.
//!
//! ## Error model
//! [`SubmissionError`] separates validation failures, transport failures and
//! semantic misses. Every variant renders as a non-empty message through
//! [`SubmissionError::user_message`].
//!
//! ## Security and privacy notes
//! Nothing in this crate inspects request payloads; normalized messages come
//! only from service error bodies or local error descriptions. Free-form text
//! headed for logs goes through [`redact_sensitive`].
//!
//! ## Example
//! ```rust
//! use calorie_counter_core::{SubmissionMachine, SubmissionStatus};
//!
//! let mut machine = SubmissionMachine::<String>::new();
//! let ticket = machine.begin().expect("idle machine accepts a submission");
//! assert!(machine.begin().is_none());
//! machine.complete(&ticket, Ok("done".to_string()));
//! assert_eq!(machine.status(), SubmissionStatus::Success);
//! ```

use std::any::Any;
use std::error::Error as StdError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Fallback used when neither the service nor a local error supplies text.
pub const GENERIC_FAILURE_MESSAGE: &str = "An unknown error occurred.";

/// Validation message for an analysis submit without a selected file.
pub const NO_FILE_SELECTED_MESSAGE: &str = "Please select a file to analyze.";

/// Validation message for a transform submit with blank text or passphrase.
pub const MISSING_TRANSFORM_INPUT_MESSAGE: &str = "Text and passphrase must both be provided.";

/// Default semantic-miss message when the service sends a blank `message`.
pub const NOTHING_RECOGNIZED_MESSAGE: &str = "No food detected in the image.";

/// Tag of the current submission lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    /// No submission has run since construction or the last reset.
    Idle,
    /// One submission is in flight.
    Loading,
    /// The last submission produced a result.
    Success,
    /// The last submission failed.
    Error,
}

/// Submission lifecycle state with its payload.
///
/// Result and error message live inside the variant, so an observer can never
/// see a result next to an error or a result while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState<T> {
    /// Nothing submitted yet.
    Idle,
    /// Waiting for the remote call.
    Loading,
    /// Completed with a result.
    Success(T),
    /// Completed with a user-facing message.
    Error(String),
}

impl<T> SubmissionState<T> {
    /// Returns the lifecycle tag.
    pub fn status(&self) -> SubmissionStatus {
        match self {
            Self::Idle => SubmissionStatus::Idle,
            Self::Loading => SubmissionStatus::Loading,
            Self::Success(_) => SubmissionStatus::Success,
            Self::Error(_) => SubmissionStatus::Error,
        }
    }

    /// Returns `true` while a submission is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Returns `true` for `Success` and `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Error(_))
    }

    /// Returns the result when the state is `Success`.
    pub fn result(&self) -> Option<&T> {
        match self {
            Self::Success(result) => Some(result),
            _ => None,
        }
    }

    /// Returns the message when the state is `Error`.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl<T> Default for SubmissionState<T> {
    fn default() -> Self {
        Self::Idle
    }
}

/// Shared flag marking whether the owning controller is still alive.
///
/// Clones observe the same flag. Revocation is one-way.
#[derive(Debug, Clone)]
pub struct Liveness {
    alive: Arc<AtomicBool>,
}

impl Liveness {
    /// Creates a live token.
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Returns `true` until [`Liveness::revoke`] is called on any clone.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Marks the owner as torn down.
    pub fn revoke(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for one in-flight attempt.
#[derive(Debug, Clone)]
pub struct Ticket {
    attempt: u64,
    liveness: Liveness,
}

impl Ticket {
    /// Sequence number of the attempt within its machine, starting at 1.
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Returns `false` once the owning machine was torn down.
    pub fn is_live(&self) -> bool {
        self.liveness.is_alive()
    }
}

/// What [`SubmissionMachine::complete`] did with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The outcome became the new state.
    Applied,
    /// The machine was torn down; the outcome was dropped.
    TornDown,
    /// The ticket does not belong to the current attempt, or the attempt was
    /// already completed.
    Stale,
}

/// Submission state machine with a re-entrancy guard and liveness token.
#[derive(Debug)]
pub struct SubmissionMachine<T> {
    state: SubmissionState<T>,
    liveness: Liveness,
    attempts: u64,
}

impl<T> SubmissionMachine<T> {
    /// Creates an idle machine.
    pub fn new() -> Self {
        Self {
            state: SubmissionState::Idle,
            liveness: Liveness::new(),
            attempts: 0,
        }
    }

    /// Returns the current state snapshot.
    pub fn state(&self) -> &SubmissionState<T> {
        &self.state
    }

    /// Returns the current lifecycle tag.
    pub fn status(&self) -> SubmissionStatus {
        self.state.status()
    }

    /// Number of attempts started so far.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Returns `true` after [`SubmissionMachine::teardown`].
    pub fn is_torn_down(&self) -> bool {
        !self.liveness.is_alive()
    }

    /// Starts an attempt.
    ///
    /// Returns `None` without touching state while an attempt is in flight or
    /// after teardown. Otherwise the state becomes `Loading`, which drops any
    /// previous result or error message in the same step.
    pub fn begin(&mut self) -> Option<Ticket> {
        if self.state.is_loading() || self.is_torn_down() {
            return None;
        }

        self.attempts = self.attempts.saturating_add(1);
        self.state = SubmissionState::Loading;
        Some(Ticket {
            attempt: self.attempts,
            liveness: self.liveness.clone(),
        })
    }

    /// Applies the outcome of the attempt identified by `ticket`.
    ///
    /// Errors are stored as their normalized user message. Only the current
    /// attempt, while still `Loading`, can leave `Loading`; every other call
    /// is a no-op.
    pub fn complete(
        &mut self,
        ticket: &Ticket,
        outcome: Result<T, SubmissionError>,
    ) -> Completion {
        if !ticket.is_live() || self.is_torn_down() {
            return Completion::TornDown;
        }

        if ticket.attempt != self.attempts || !self.state.is_loading() {
            return Completion::Stale;
        }

        self.state = match outcome {
            Ok(result) => SubmissionState::Success(result),
            Err(error) => SubmissionState::Error(error.user_message()),
        };
        Completion::Applied
    }

    /// Moves a terminal state back to `Idle`.
    ///
    /// Returns `true` when a result or error was cleared.
    pub fn reset_terminal(&mut self) -> bool {
        if self.state.is_terminal() {
            self.state = SubmissionState::Idle;
            return true;
        }
        false
    }

    /// Takes the result out of a `Success` state, leaving `Idle`.
    pub fn take_result(&mut self) -> Option<T> {
        if !matches!(self.state, SubmissionState::Success(_)) {
            return None;
        }

        match std::mem::take(&mut self.state) {
            SubmissionState::Success(result) => Some(result),
            _ => None,
        }
    }

    /// Revokes the liveness token so in-flight completions are ignored.
    pub fn teardown(&mut self) {
        self.liveness.revoke();
    }
}

impl<T> Default for SubmissionMachine<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Broad error category for routing and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Required local input is missing.
    Validation,
    /// Network failure, non-2xx status or malformed body.
    Transport,
    /// Well-formed response that declares no usable result.
    SemanticMiss,
}

/// Failure of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// Local precondition failed; no request was sent.
    #[error("{0}")]
    Validation(String),
    /// The call failed or its response could not be used.
    #[error("{message}")]
    Transport {
        /// HTTP status when a response was received.
        status: Option<u16>,
        /// Normalized user-facing message.
        message: String,
    },
    /// The service answered but recognized nothing.
    #[error("{0}")]
    SemanticMiss(String),
}

impl SubmissionError {
    /// Builds a transport error with a status code.
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    /// Builds a semantic miss from the service message, falling back to
    /// [`NOTHING_RECOGNIZED_MESSAGE`] for blank text.
    pub fn semantic_miss(message: Option<&str>) -> Self {
        Self::SemanticMiss(non_blank_or(message, NOTHING_RECOGNIZED_MESSAGE))
    }

    /// Returns the error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::SemanticMiss(_) => ErrorKind::SemanticMiss,
        }
    }

    /// Returns the HTTP status attached to a transport error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Renderable message; never empty.
    pub fn user_message(&self) -> String {
        let message = match self {
            Self::Validation(message)
            | Self::Transport { message, .. }
            | Self::SemanticMiss(message) => message.as_str(),
        };
        non_blank_or(Some(message), GENERIC_FAILURE_MESSAGE)
    }
}

/// Reads the `detail` message from a service error body.
///
/// Accepts a plain string or a list of validation entries carrying `msg`,
/// which are joined with `"; "`. Returns `None` for non-JSON bodies, a missing
/// field or blank text.
pub fn extract_detail(body: &[u8]) -> Option<String> {
    let parsed: Value = serde_json::from_slice(body).ok()?;
    let detail = parsed.get("detail")?;

    let message = match detail {
        Value::String(text) => text.trim().to_string(),
        Value::Array(entries) => entries
            .iter()
            .filter_map(|entry| match entry {
                Value::String(text) => Some(text.trim()),
                Value::Object(_) => entry.get("msg").and_then(Value::as_str).map(str::trim),
                _ => None,
            })
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        _ => return None,
    };

    if message.is_empty() {
        None
    } else {
        Some(message)
    }
}

/// Normalizes a non-2xx response into a transport error.
///
/// The service `detail` wins; otherwise `fallback` is used.
pub fn normalize_response_failure(status: u16, body: &[u8], fallback: &str) -> SubmissionError {
    let message = extract_detail(body)
        .unwrap_or_else(|| non_blank_or(Some(fallback), GENERIC_FAILURE_MESSAGE));
    SubmissionError::transport(Some(status), message)
}

/// Normalizes a local failure (unreachable host, aborted request) into a
/// transport error carrying the error's own description.
pub fn normalize_local_error(error: &(dyn StdError + 'static), fallback: &str) -> SubmissionError {
    let description = error.to_string();
    let message = non_blank_or(
        Some(description.as_str()),
        &non_blank_or(Some(fallback), GENERIC_FAILURE_MESSAGE),
    );
    SubmissionError::transport(None, message)
}

/// Normalizes a panic caught around response handling.
///
/// A panic is an internal fault, so the user sees `fallback`; the payload
/// text is only available for logs through [`panic_description`].
pub fn normalize_panic(_payload: &(dyn Any + Send), fallback: &str) -> SubmissionError {
    SubmissionError::transport(None, non_blank_or(Some(fallback), GENERIC_FAILURE_MESSAGE))
}

/// Text of a `&str` or `String` panic payload.
pub fn panic_description(payload: &(dyn Any + Send)) -> Option<String> {
    payload
        .downcast_ref::<&str>()
        .map(|text| (*text).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
}

const SENSITIVE_KEYS: [&str; 5] = ["password", "passphrase", "token", "authorization", "bearer"];
const REDACTED: &str = "<redacted>";

/// Redacts values that follow common secret markers in free-form text.
///
/// A value runs from the first non-separator after the marker up to the next
/// `&`, `,`, `;`, quote, closing brace or line break.
pub fn redact_sensitive(input: &str) -> String {
    SENSITIVE_KEYS
        .iter()
        .fold(input.to_string(), |text, key| redact_key_value(&text, key))
}

fn redact_key_value(input: &str, key: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let mut output = String::with_capacity(input.len());
    let mut cursor = 0;

    while let Some(offset) = lower[cursor..].find(key) {
        let key_end = cursor + offset + key.len();
        let value_start = input[key_end..]
            .find(|c: char| !is_separator(c))
            .map_or(input.len(), |index| key_end + index);
        let value_end = input[value_start..]
            .find(is_terminator)
            .map_or(input.len(), |index| value_start + index);

        output.push_str(&input[cursor..value_start]);
        if value_end > value_start {
            output.push_str(REDACTED);
        }
        cursor = value_end;
    }

    output.push_str(&input[cursor..]);
    output
}

fn is_separator(c: char) -> bool {
    matches!(c, '=' | ':' | '"' | '\'' | '`') || c.is_whitespace()
}

fn is_terminator(c: char) -> bool {
    matches!(c, '&' | ',' | ';' | '"' | '\'' | '`' | '}' | '\n' | '\r')
}

fn non_blank_or(message: Option<&str>, fallback: &str) -> String {
    match message.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => fallback.to_string(),
    }
}
