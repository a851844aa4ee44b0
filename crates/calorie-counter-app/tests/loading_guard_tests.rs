//! Integration tests for the in-flight re-entrancy guard.

mod common;

use std::time::Duration;

use calorie_counter_app::AppError;
use calorie_counter_core::SubmissionStatus;
use calorie_counter_transport::ServiceResponse;
use common::{GatedTransport, analysis_controller, image, transform_controller};

#[test]
fn loading_guard_tests_second_analysis_submit_sends_nothing() {
    let (transport, release) = GatedTransport::new();
    let (mut controller, _previews) = analysis_controller(transport.clone());
    controller
        .select_file(image("meal.jpg"))
        .expect("select should succeed");

    assert!(controller.dispatch().expect("first dispatch should start"));
    assert_eq!(controller.status(), SubmissionStatus::Loading);
    assert!(!controller.dispatch().expect("second dispatch is a no-op"));
    assert!(
        !controller
            .submit()
            .expect("blocking submit is a no-op while loading")
    );
    assert_eq!(controller.status(), SubmissionStatus::Loading);
    assert_eq!(
        controller.selected_file().map(|file| file.name()),
        Some("meal.jpg")
    );

    release
        .send(Ok(ServiceResponse::new(
            200,
            r#"{"food_name":"rice","calories":"200","protein":"4","fat":"0.4","carbs":"45"}"#,
        )))
        .expect("worker should be waiting");
    assert!(controller.wait_for_completion(Duration::from_secs(5)));
    assert_eq!(transport.call_count(), 1);
    assert_eq!(controller.status(), SubmissionStatus::Success);
}

#[test]
fn loading_guard_tests_inputs_are_frozen_while_loading() {
    let (transport, release) = GatedTransport::new();
    let mut controller = transform_controller(transport.clone(), "secret", "pw");

    assert!(controller.dispatch_forward().expect("dispatch should start"));
    assert!(matches!(controller.set_text("changed"), Err(AppError::Busy)));
    assert!(matches!(controller.set_passphrase("other"), Err(AppError::Busy)));
    assert!(!controller.dispatch_inverse().expect("second dispatch is a no-op"));
    assert_eq!(controller.text(), "secret");
    assert_eq!(controller.passphrase(), "pw");
    assert!(!controller.panel().encrypt_enabled);

    release
        .send(Ok(ServiceResponse::new(200, r#"{"encrypted_text":"abc123"}"#)))
        .expect("worker should be waiting");
    assert!(controller.wait_for_completion(Duration::from_secs(5)));
    assert_eq!(transport.call_count(), 1);
    assert_eq!(controller.state().result().map(String::as_str), Some("abc123"));
}

#[test]
fn loading_guard_tests_file_selection_is_rejected_while_loading() {
    let (transport, release) = GatedTransport::new();
    let (mut controller, previews) = analysis_controller(transport);
    controller
        .select_file(image("first.jpg"))
        .expect("select should succeed");
    let first_preview = controller.preview_id().map(str::to_string);

    assert!(controller.dispatch().expect("dispatch should start"));
    assert!(matches!(
        controller.select_file(image("second.jpg")),
        Err(AppError::Busy)
    ));
    assert_eq!(controller.preview_id().map(str::to_string), first_preview);
    assert_eq!(previews.live_handles(), 1);

    release
        .send(Ok(ServiceResponse::new(500, "")))
        .expect("worker should be waiting");
    assert!(controller.wait_for_completion(Duration::from_secs(5)));
}
