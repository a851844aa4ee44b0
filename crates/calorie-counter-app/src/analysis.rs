//! Analysis submission controller.
//!
//! Holds the selected image and its preview handle, uploads the image to the
//! analyze endpoint and interprets the reply as a nutrition record or a
//! semantic miss.

use std::sync::Arc;
use std::time::Duration;

use calorie_counter_contract::{
    ANALYZE_FALLBACK_MESSAGE, ANALYZE_IMAGE_FIELD, AnalyzeOutcome, NutritionRecord,
    parse_analyze_response,
};
use calorie_counter_core::{
    GENERIC_FAILURE_MESSAGE, NO_FILE_SELECTED_MESSAGE, SubmissionError, SubmissionState,
    SubmissionStatus, normalize_local_error, normalize_response_failure, redact_sensitive,
};
use calorie_counter_preview::{PreviewSlot, PreviewStore, SelectedFile};
use calorie_counter_transport::{
    MultipartFile, ServiceEndpoints, ServiceRequest, ServiceTransport,
};
use calorie_counter_ui::{AnalysisPanel, project_analysis};

use crate::AppError;
use crate::dispatch::SubmissionDriver;

const STAGE: &str = "analysis";

/// Controller of the image analysis workflow.
pub struct AnalysisController {
    endpoints: ServiceEndpoints,
    transport: Arc<dyn ServiceTransport>,
    selected: Option<SelectedFile>,
    preview: PreviewSlot,
    driver: SubmissionDriver<NutritionRecord>,
}

impl AnalysisController {
    /// Creates an idle controller with no file selected.
    pub fn new(
        endpoints: ServiceEndpoints,
        transport: Arc<dyn ServiceTransport>,
        previews: Arc<dyn PreviewStore>,
    ) -> Self {
        Self {
            endpoints,
            transport,
            selected: None,
            preview: PreviewSlot::new(previews),
            driver: SubmissionDriver::new(STAGE),
        }
    }

    /// Replaces the selected file and its preview.
    ///
    /// The previous preview handle is released before the new one is
    /// acquired. A terminal result or error is cleared; no request is sent.
    ///
    /// # Errors
    /// Returns [`AppError::Busy`] while a submission is in flight and
    /// [`AppError::Preview`] when the preview store fails.
    pub fn select_file(&mut self, file: SelectedFile) -> Result<(), AppError> {
        if self.driver.is_loading() {
            return Err(AppError::Busy);
        }

        self.driver.reset_terminal();
        self.selected = None;
        let preview_id = self.preview.replace(&file)?.id().to_string();
        tracing::info!(
            stage = STAGE,
            action = "select_file",
            preview_id = %preview_id,
            bytes = file.len()
        );
        self.selected = Some(file);
        Ok(())
    }

    /// Currently selected file.
    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    /// Id of the live preview handle.
    pub fn preview_id(&self) -> Option<&str> {
        self.preview.current().map(|handle| handle.id())
    }

    /// Current state snapshot.
    pub fn state(&self) -> &SubmissionState<NutritionRecord> {
        self.driver.state()
    }

    /// Current lifecycle tag.
    pub fn status(&self) -> SubmissionStatus {
        self.driver.status()
    }

    /// Uploads the selected file and waits for the reply.
    ///
    /// Returns `Ok(false)` when a submission is already in flight.
    ///
    /// # Errors
    /// Returns [`SubmissionError::Validation`] without changing status when
    /// no file is selected.
    pub fn submit(&mut self) -> Result<bool, SubmissionError> {
        let request = self.build_request()?;
        let transport = Arc::clone(&self.transport);
        Ok(self
            .driver
            .run_blocking(ANALYZE_FALLBACK_MESSAGE, move || {
                analyze(transport.as_ref(), &request)
            }))
    }

    /// Uploads the selected file on a worker thread.
    ///
    /// Returns `Ok(false)` when a submission is already in flight. Drain the
    /// outcome with [`AnalysisController::poll`] or
    /// [`AnalysisController::wait_for_completion`].
    ///
    /// # Errors
    /// Returns [`AppError::Submission`] when no file is selected and
    /// [`AppError::Worker`] when the worker cannot start.
    pub fn dispatch(&mut self) -> Result<bool, AppError> {
        let request = self.build_request()?;
        let transport = Arc::clone(&self.transport);
        self.driver.spawn(ANALYZE_FALLBACK_MESSAGE, move || {
            analyze(transport.as_ref(), &request)
        })
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
    pub fn panel(&self) -> AnalysisPanel {
        project_analysis(
            self.state(),
            self.selected.as_ref().map(SelectedFile::name),
            self.preview_id(),
        )
    }

    fn build_request(&self) -> Result<ServiceRequest, SubmissionError> {
        let Some(file) = &self.selected else {
            return Err(SubmissionError::Validation(
                NO_FILE_SELECTED_MESSAGE.to_string(),
            ));
        };

        Ok(ServiceRequest::multipart(
            self.endpoints.analyze().clone(),
            MultipartFile {
                field: ANALYZE_IMAGE_FIELD.to_string(),
                file_name: file.name().to_string(),
                content_type: file.content_type().to_string(),
                bytes: file.bytes().to_vec(),
            },
        ))
    }
}

impl Drop for AnalysisController {
    fn drop(&mut self) {
        self.driver.teardown();
    }
}

impl std::fmt::Debug for AnalysisController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisController")
            .field("endpoints", &self.endpoints)
            .field("selected", &self.selected)
            .field("preview", &self.preview)
            .field("driver", &self.driver)
            .finish_non_exhaustive()
    }
}

fn analyze(
    transport: &dyn ServiceTransport,
    request: &ServiceRequest,
) -> Result<NutritionRecord, SubmissionError> {
    let response = transport
        .send(request)
        .map_err(|error| normalize_local_error(&error, GENERIC_FAILURE_MESSAGE))?;

    if !response.is_success() {
        return Err(normalize_response_failure(
            response.status,
            &response.body,
            ANALYZE_FALLBACK_MESSAGE,
        ));
    }

    match parse_analyze_response(&response.body) {
        Ok(AnalyzeOutcome::Recognized(record)) => Ok(record),
        Ok(AnalyzeOutcome::NothingRecognized(message)) => {
            Err(SubmissionError::semantic_miss(Some(&message)))
        }
        Err(error) => {
            tracing::warn!(
                stage = STAGE,
                action = "malformed_response",
                status = response.status,
                error = %redact_sensitive(&error.to_string())
            );
            Err(SubmissionError::transport(
                Some(response.status),
                ANALYZE_FALLBACK_MESSAGE,
            ))
        }
    }
}
