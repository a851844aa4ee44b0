//! Integration tests for chaining encrypt and decrypt through promotion.

mod common;

use calorie_counter_contract::TransformDirection;
use calorie_counter_core::{SubmissionState, SubmissionStatus};
use common::{ScriptedTransport, transform_controller};
use serde_json::json;

#[test]
fn transform_roundtrip_tests_forward_then_promote_yields_token_as_input() {
    let transport = ScriptedTransport::json_replies(&[(200, json!({"encryptedText":"abc123"}))]);
    let mut controller = transform_controller(transport.clone(), "secret", "pw");

    assert!(controller.submit_forward().expect("inputs are valid"));
    assert_eq!(controller.status(), SubmissionStatus::Success);
    assert_eq!(controller.state().result().map(String::as_str), Some("abc123"));
    assert_eq!(controller.result_for_clipboard(), Some("abc123"));
    assert!(controller.panel().result_actions_visible);

    assert!(controller.promote_result_to_input());
    assert_eq!(controller.text(), "abc123");
    assert!(controller.state().result().is_none());
    assert_eq!(controller.result_for_clipboard(), None);
    assert_eq!(transport.call_count(), 1);
}

#[test]
fn transform_roundtrip_tests_inverse_sends_promoted_result() {
    let transport = ScriptedTransport::json_replies(&[
        (200, json!({"encrypted_text":"gAAAAB-token"})),
        (200, json!({"decrypted_text":"secret"})),
    ]);
    let mut controller = transform_controller(transport.clone(), "secret", "pw");

    controller.submit_forward().expect("inputs are valid");
    assert!(controller.promote_result_to_input());
    controller.submit_inverse().expect("inputs are valid");

    assert_eq!(
        transport.json_body(0),
        json!({"text":"secret","password":"pw"})
    );
    assert_eq!(
        transport.json_body(1),
        json!({"encrypted_text":"gAAAAB-token","password":"pw"})
    );
    let requests = transport.requests();
    assert_eq!(requests[0].url.path(), "/api/encrypt");
    assert_eq!(requests[1].url.path(), "/api/decrypt");
    assert_eq!(
        controller.state(),
        &SubmissionState::Success("secret".to_string())
    );
    assert_eq!(controller.last_direction(), Some(TransformDirection::Inverse));
}

#[test]
fn transform_roundtrip_tests_promote_without_result_is_noop() {
    let transport = ScriptedTransport::json_replies(&[(400, json!({"detail":"Invalid token"}))]);
    let mut controller = transform_controller(transport, "garbage", "pw");

    assert!(!controller.promote_result_to_input());
    controller.submit_inverse().expect("inputs are valid");
    assert!(!controller.promote_result_to_input());
    assert_eq!(controller.text(), "garbage");
    assert_eq!(
        controller.state(),
        &SubmissionState::Error("Invalid token".to_string())
    );
}
