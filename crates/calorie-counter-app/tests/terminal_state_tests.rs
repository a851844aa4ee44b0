//! Integration tests for leaving `Loading` on every completion path.

mod common;

use calorie_counter_core::{GENERIC_FAILURE_MESSAGE, SubmissionState, SubmissionStatus};
use calorie_counter_transport::{ServiceResponse, TransportError};
use calorie_counter_contract::ENCRYPT_FALLBACK_MESSAGE;
use common::{
    PanickingTransport, ScriptedTransport, analysis_controller, image, transform_controller,
};
use serde_json::json;

#[test]
fn terminal_state_tests_every_outcome_is_terminal() {
    let replies = vec![
        Ok(ServiceResponse::new(200, r#"{"encrypted_text":"t1"}"#)),
        Ok(ServiceResponse::new(400, r#"{"detail":"Invalid password"}"#)),
        Ok(ServiceResponse::new(200, "not json")),
        Err(TransportError::Timeout),
        Err(TransportError::Unreachable(String::new())),
    ];
    let count = replies.len();
    let transport = ScriptedTransport::new(replies);
    let mut controller = transform_controller(transport.clone(), "secret", "pw");

    for _ in 0..count {
        assert!(controller.submit_forward().expect("inputs are valid"));
        assert!(
            matches!(
                controller.status(),
                SubmissionStatus::Success | SubmissionStatus::Error
            ),
            "status must be terminal, got {:?}",
            controller.status()
        );
        if let Some(message) = controller.state().error_message() {
            assert!(!message.trim().is_empty());
        }
    }
    assert_eq!(transport.call_count(), count);
}

#[test]
fn terminal_state_tests_transport_error_descriptions_are_used() {
    let transport = ScriptedTransport::new(vec![
        Err(TransportError::Timeout),
        Err(TransportError::Unreachable("connection refused".to_string())),
    ]);
    let mut controller = transform_controller(transport, "secret", "pw");

    controller.submit_forward().expect("inputs are valid");
    assert_eq!(
        controller.state(),
        &SubmissionState::Error("request timed out".to_string())
    );

    controller.submit_forward().expect("inputs are valid");
    assert_eq!(
        controller.state(),
        &SubmissionState::Error("service unreachable: connection refused".to_string())
    );
    assert_ne!(controller.state().error_message(), Some(GENERIC_FAILURE_MESSAGE));
}

#[test]
fn terminal_state_tests_new_submission_drops_previous_result() {
    let transport = ScriptedTransport::json_replies(&[
        (
            200,
            json!({"food_name":"apple","calories":"95","protein":"0.5","fat":"0.3","carbs":"25"}),
        ),
        (422, json!({"detail":[{"msg":"field required"}]})),
    ]);
    let (mut controller, _previews) = analysis_controller(transport);
    controller
        .select_file(image("apple.jpg"))
        .expect("select should succeed");

    controller.submit().expect("file is selected");
    assert_eq!(controller.status(), SubmissionStatus::Success);

    controller.submit().expect("file is selected");
    assert_eq!(
        controller.state(),
        &SubmissionState::Error("field required".to_string())
    );
    assert!(controller.state().result().is_none());
    assert!(controller.panel().nutrition_lines.is_empty());
}

#[test]
fn terminal_state_tests_worker_panic_shows_endpoint_fallback() {
    let transport = PanickingTransport::new("index out of bounds: the len is 3 but the index is 5");
    let mut controller = transform_controller(transport, "meal notes", "secret");

    controller.submit_forward().expect("inputs are present");

    assert_eq!(
        controller.state(),
        &SubmissionState::Error(ENCRYPT_FALLBACK_MESSAGE.to_string())
    );
    assert_eq!(controller.status(), SubmissionStatus::Error);
}
