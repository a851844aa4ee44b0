//! Transform submission controller.
//!
//! Sends text plus passphrase to the encrypt or decrypt endpoint, as chosen by
//! the caller, and keeps the returned string as an opaque result.

use std::sync::Arc;
use std::time::Duration;

use calorie_counter_contract::{
    ContractError, TransformDirection, TransformRequest, parse_transform_response,
};
use calorie_counter_core::{
    GENERIC_FAILURE_MESSAGE, MISSING_TRANSFORM_INPUT_MESSAGE, SubmissionError, SubmissionState,
    SubmissionStatus, normalize_local_error, normalize_response_failure, redact_sensitive,
};
use calorie_counter_transport::{ServiceEndpoints, ServiceRequest, ServiceTransport};
use calorie_counter_ui::{TransformPanel, project_transform};

use crate::AppError;
use crate::dispatch::SubmissionDriver;

const STAGE: &str = "transform";

/// Controller of the encrypt/decrypt workflow.
pub struct TransformController {
    endpoints: ServiceEndpoints,
    transport: Arc<dyn ServiceTransport>,
    text: String,
    passphrase: String,
    last_direction: Option<TransformDirection>,
    driver: SubmissionDriver<String>,
}

impl TransformController {
    /// Creates an idle controller with empty inputs.
    pub fn new(endpoints: ServiceEndpoints, transport: Arc<dyn ServiceTransport>) -> Self {
        Self {
            endpoints,
            transport,
            text: String::new(),
            passphrase: String::new(),
            last_direction: None,
            driver: SubmissionDriver::new(STAGE),
        }
    }

    /// Replaces the pending text.
    ///
    /// # Errors
    /// Returns [`AppError::Busy`] while a submission is in flight.
    pub fn set_text(&mut self, value: impl Into<String>) -> Result<(), AppError> {
        self.ensure_idle()?;
        self.text = value.into();
        Ok(())
    }

    /// Replaces the pending passphrase.
    ///
    /// # Errors
    /// Returns [`AppError::Busy`] while a submission is in flight.
    pub fn set_passphrase(&mut self, value: impl Into<String>) -> Result<(), AppError> {
        self.ensure_idle()?;
        self.passphrase = value.into();
        Ok(())
    }

    /// Pending text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Pending passphrase.
    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    /// Direction of the most recent submission.
    pub fn last_direction(&self) -> Option<TransformDirection> {
        self.last_direction
    }

    /// Current state snapshot.
    pub fn state(&self) -> &SubmissionState<String> {
        self.driver.state()
    }

    /// Current lifecycle tag.
    pub fn status(&self) -> SubmissionStatus {
        self.driver.status()
    }

    /// Encrypts the pending text and waits for the reply.
    ///
    /// # Errors
    /// See [`TransformController::submit`].
    pub fn submit_forward(&mut self) -> Result<bool, SubmissionError> {
        self.submit(TransformDirection::Forward)
    }

    /// Decrypts the pending text and waits for the reply.
    ///
    /// # Errors
    /// See [`TransformController::submit`].
    pub fn submit_inverse(&mut self) -> Result<bool, SubmissionError> {
        self.submit(TransformDirection::Inverse)
    }

    /// Sends the pending inputs in `direction` and waits for the reply.
    ///
    /// Returns `Ok(false)` when a submission is already in flight.
    ///
    /// # Errors
    /// Returns [`SubmissionError::Validation`] without changing status when
    /// text or passphrase is empty.
    pub fn submit(&mut self, direction: TransformDirection) -> Result<bool, SubmissionError> {
        let request = self.build_request(direction)?;
        let transport = Arc::clone(&self.transport);
        let started = self
            .driver
            .run_blocking(direction.fallback_message(), move || {
                transform(transport.as_ref(), &request, direction)
            });
        if started {
            self.last_direction = Some(direction);
        }
        Ok(started)
    }

    /// Encrypts the pending text on a worker thread.
    ///
    /// # Errors
    /// See [`TransformController::dispatch`].
    pub fn dispatch_forward(&mut self) -> Result<bool, AppError> {
        self.dispatch(TransformDirection::Forward)
    }

    /// Decrypts the pending text on a worker thread.
    ///
    /// # Errors
    /// See [`TransformController::dispatch`].
    pub fn dispatch_inverse(&mut self) -> Result<bool, AppError> {
        self.dispatch(TransformDirection::Inverse)
    }

    /// Sends the pending inputs in `direction` on a worker thread.
    ///
    /// # Errors
    /// Returns [`AppError::Submission`] for empty inputs and
    /// [`AppError::Worker`] when the worker cannot start.
    pub fn dispatch(&mut self, direction: TransformDirection) -> Result<bool, AppError> {
        let request = self.build_request(direction)?;
        let transport = Arc::clone(&self.transport);
        let started = self.driver.spawn(direction.fallback_message(), move || {
            transform(transport.as_ref(), &request, direction)
        })?;
        if started {
            self.last_direction = Some(direction);
        }
        Ok(started)
    }

    /// Moves the current result into the pending text.
    ///
    /// Returns `false` when there is no result. Sends nothing.
    pub fn promote_result_to_input(&mut self) -> bool {
        match self.driver.take_result() {
            Some(result) => {
                tracing::debug!(stage = STAGE, action = "promote_result");
                self.text = result;
                true
            }
            None => false,
        }
    }

    /// Result text for an external clipboard.
    pub fn result_for_clipboard(&self) -> Option<&str> {
        self.state().result().map(String::as_str)
    }

    /// Applies worker outcomes received so far.
    pub fn poll(&mut self) -> bool {
        self.driver.poll()
    }

    /// Waits up to `timeout` for the in-flight submission.
    pub fn wait_for_completion(&mut self, timeout: Duration) -> bool {
        self.driver.wait_for_completion(timeout)
    }

    /// Read-only view model of the controller.
    pub fn panel(&self) -> TransformPanel {
        project_transform(self.state(), &self.text, &self.passphrase)
    }

    fn ensure_idle(&self) -> Result<(), AppError> {
        if self.driver.is_loading() {
            return Err(AppError::Busy);
        }
        Ok(())
    }

    fn build_request(
        &self,
        direction: TransformDirection,
    ) -> Result<ServiceRequest, SubmissionError> {
        if self.text.is_empty() || self.passphrase.is_empty() {
            return Err(SubmissionError::Validation(
                MISSING_TRANSFORM_INPUT_MESSAGE.to_string(),
            ));
        }

        let url = match direction {
            TransformDirection::Forward => self.endpoints.encrypt(),
            TransformDirection::Inverse => self.endpoints.decrypt(),
        };
        let body = TransformRequest::new(direction, &self.text, &self.passphrase)
            .to_json_bytes()
            .map_err(|error| encoding_failure(direction, &error))?;
        Ok(ServiceRequest::json(url.clone(), body))
    }
}

impl Drop for TransformController {
    fn drop(&mut self) {
        self.driver.teardown();
    }
}

impl std::fmt::Debug for TransformController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformController")
            .field("endpoints", &self.endpoints)
            .field("text_len", &self.text.len())
            .field("passphrase", &"<redacted>")
            .field("last_direction", &self.last_direction)
            .field("driver", &self.driver)
            .finish_non_exhaustive()
    }
}

fn transform(
    transport: &dyn ServiceTransport,
    request: &ServiceRequest,
    direction: TransformDirection,
) -> Result<String, SubmissionError> {
    let response = transport
        .send(request)
        .map_err(|error| normalize_local_error(&error, GENERIC_FAILURE_MESSAGE))?;

    if !response.is_success() {
        return Err(normalize_response_failure(
            response.status,
            &response.body,
            direction.fallback_message(),
        ));
    }

    parse_transform_response(direction, &response.body).map_err(|error| {
        tracing::warn!(
            stage = STAGE,
            action = "malformed_response",
            direction = direction.as_str(),
            status = response.status,
            error = %redact_sensitive(&error.to_string())
        );
        SubmissionError::transport(Some(response.status), direction.fallback_message())
    })
}

fn encoding_failure(direction: TransformDirection, error: &ContractError) -> SubmissionError {
    tracing::warn!(
        stage = STAGE,
        action = "encode_request",
        error = %redact_sensitive(&error.to_string())
    );
    SubmissionError::transport(None, direction.fallback_message())
}
