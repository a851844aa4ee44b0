#![warn(missing_docs)]
//! # calorie-counter-ui
//!
//! ## Purpose
//! Projects controller state into the read-only view model a renderer needs.
//!
//! ## Responsibilities
//! - Decide which actions are enabled for the current submission state.
//! - Pick busy/idle button labels.
//! - Format nutrition values and transform results for display.
//!
//! ## Data flow
//! Controller snapshot -> [`project_analysis`] / [`project_transform`] ->
//! panel structs rendered by a shell (the CLI prints them via `Display`).
//!
//! ## Ownership and lifetimes
//! Panels own their strings so they can be handed to any renderer without
//! borrowing controller state.
//!
//! ## Error model
//! This crate favors explicit state over recoverable errors; projections are
//! total functions.
//!
//! ## Security and privacy notes
//! Panels never include the passphrase.

use std::fmt;

use calorie_counter_contract::NutritionRecord;
use calorie_counter_core::{SubmissionState, SubmissionStatus};

/// Label of the analyze button while idle.
pub const ANALYZE_LABEL: &str = "Analyze Image";
/// Label of the analyze button while loading.
pub const ANALYZING_LABEL: &str = "Analyzing...";
/// Label of the encrypt button while idle.
pub const ENCRYPT_LABEL: &str = "Encrypt";
/// Label of the decrypt button while idle.
pub const DECRYPT_LABEL: &str = "Decrypt";
/// Label of both transform buttons while loading.
pub const TRANSFORMING_LABEL: &str = "Processing...";

/// View model of the analysis panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisPanel {
    /// Lifecycle tag of the controller.
    pub status: SubmissionStatus,
    /// Whether the analyze action may be triggered.
    pub submit_enabled: bool,
    /// Analyze button label.
    pub submit_label: String,
    /// Name of the selected file.
    pub file_name: Option<String>,
    /// Id of the live preview handle.
    pub preview_id: Option<String>,
    /// Error text to show.
    pub error: Option<String>,
    /// Recognized food name.
    pub food_name: Option<String>,
    /// Formatted nutrition lines.
    pub nutrition_lines: Vec<String>,
}

/// Projects analysis controller state.
pub fn project_analysis(
    state: &SubmissionState<NutritionRecord>,
    file_name: Option<&str>,
    preview_id: Option<&str>,
) -> AnalysisPanel {
    let loading = state.is_loading();
    AnalysisPanel {
        status: state.status(),
        submit_enabled: !loading,
        submit_label: if loading { ANALYZING_LABEL } else { ANALYZE_LABEL }.to_string(),
        file_name: file_name.map(str::to_string),
        preview_id: preview_id.map(str::to_string),
        error: state.error_message().map(str::to_string),
        food_name: state.result().map(|record| record.food_name.clone()),
        nutrition_lines: state.result().map(nutrition_lines).unwrap_or_default(),
    }
}

/// Formats a nutrition record as display lines.
pub fn nutrition_lines(record: &NutritionRecord) -> Vec<String> {
    vec![
        format!("Food: {}", record.food_name),
        format!("Calories: {}", record.calories),
        format!("Protein: {}g", record.protein),
        format!("Fat: {}g", record.fat),
        format!("Carbs: {}g", record.carbs),
    ]
}

impl fmt::Display for AnalysisPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.file_name {
            writeln!(f, "File: {name}")?;
        }
        if let Some(id) = &self.preview_id {
            writeln!(f, "Preview: {id}")?;
        }
        if let Some(error) = &self.error {
            writeln!(f, "Error: {error}")?;
        }
        if !self.nutrition_lines.is_empty() {
            writeln!(f, "Nutritional Information")?;
            for line in &self.nutrition_lines {
                writeln!(f, "  {line}")?;
            }
        }
        Ok(())
    }
}

/// View model of the transform panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformPanel {
    /// Lifecycle tag of the controller.
    pub status: SubmissionStatus,
    /// Whether encrypt may be triggered.
    pub encrypt_enabled: bool,
    /// Whether decrypt may be triggered.
    pub decrypt_enabled: bool,
    /// Encrypt button label.
    pub encrypt_label: String,
    /// Decrypt button label.
    pub decrypt_label: String,
    /// Error text to show.
    pub error: Option<String>,
    /// Result text to show.
    pub result: Option<String>,
    /// Whether copy and move-to-input actions are offered.
    pub result_actions_visible: bool,
}

/// Projects transform controller state.
///
/// Both actions are disabled while loading and while either input is empty.
pub fn project_transform(
    state: &SubmissionState<String>,
    text: &str,
    passphrase: &str,
) -> TransformPanel {
    let loading = state.is_loading();
    let actionable = !loading && !text.is_empty() && !passphrase.is_empty();
    let result = state.result().filter(|result| !result.is_empty()).cloned();

    TransformPanel {
        status: state.status(),
        encrypt_enabled: actionable,
        decrypt_enabled: actionable,
        encrypt_label: if loading { TRANSFORMING_LABEL } else { ENCRYPT_LABEL }.to_string(),
        decrypt_label: if loading { TRANSFORMING_LABEL } else { DECRYPT_LABEL }.to_string(),
        error: state.error_message().map(str::to_string),
        result_actions_visible: result.is_some(),
        result,
    }
}

impl fmt::Display for TransformPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(error) = &self.error {
            writeln!(f, "Error: {error}")?;
        }
        if let Some(result) = &self.result {
            writeln!(f, "Result")?;
            writeln!(f, "  {result}")?;
        }
        Ok(())
    }
}
