//! Validates contract fixtures and client-built bodies against the JSON schemas.

use calorie_counter_contract::{
    AnalyzeOutcome, TransformDirection, TransformRequest, parse_analyze_response,
    parse_transform_response,
};
use jsonschema::JSONSchema;
use serde_json::{Value, json};

fn contract_path(relative: &str) -> String {
    format!("{}/../../contracts/{relative}", env!("CARGO_MANIFEST_DIR"))
}

fn load_json(relative: &str) -> Value {
    let raw =
        std::fs::read_to_string(contract_path(relative)).expect("json file should be readable");
    serde_json::from_str(&raw).expect("json file should be valid")
}

fn compile_validator(name: &str) -> JSONSchema {
    let schema = load_json(&format!("{name}.schema.json"));
    JSONSchema::compile(&schema).expect("schema should compile")
}

fn assert_fixture_valid(schema: &str, fixture: &str) -> Value {
    let validator = compile_validator(schema);
    let value = load_json(&format!("fixtures/{fixture}.valid.json"));
    assert!(
        validator.is_valid(&value),
        "{fixture} fixture should validate against {schema} schema"
    );
    value
}

#[test]
fn analyze_record_fixture_matches_schema_and_parses() {
    let value = assert_fixture_valid("analyze-response", "analyze-response");
    let raw = serde_json::to_vec(&value).expect("fixture should serialize");

    let AnalyzeOutcome::Recognized(record) =
        parse_analyze_response(&raw).expect("fixture should parse")
    else {
        panic!("record fixture must be recognized");
    };
    assert_eq!(record.food_name, "apple");
}

#[test]
fn analyze_miss_fixture_matches_schema_and_parses() {
    let value = assert_fixture_valid("analyze-response", "analyze-response-miss");
    let raw = serde_json::to_vec(&value).expect("fixture should serialize");

    assert!(matches!(
        parse_analyze_response(&raw).expect("fixture should parse"),
        AnalyzeOutcome::NothingRecognized(_)
    ));
}

#[test]
fn analyze_schema_rejects_incomplete_record() {
    let validator = compile_validator("analyze-response");
    assert!(!validator.is_valid(&json!({"food_name":"apple","calories":"95"})));
}

#[test]
fn error_body_fixture_matches_schema() {
    assert_fixture_valid("error-body", "error-body");
    let validator = compile_validator("error-body");
    assert!(validator.is_valid(&json!({"detail":"Invalid password"})));
    assert!(!validator.is_valid(&json!({"error":"Invalid password"})));
}

#[test]
fn transform_fixtures_match_schemas() {
    assert_fixture_valid("encrypt-request", "encrypt-request");
    assert_fixture_valid("decrypt-request", "decrypt-request");

    let encrypted = assert_fixture_valid("encrypt-response", "encrypt-response");
    let decrypted = assert_fixture_valid("decrypt-response", "decrypt-response");
    let encrypted = serde_json::to_vec(&encrypted).expect("fixture should serialize");
    let decrypted = serde_json::to_vec(&decrypted).expect("fixture should serialize");

    assert_eq!(
        parse_transform_response(TransformDirection::Forward, &encrypted)
            .expect("encrypt fixture should parse"),
        "c2FsdHNhbHRzYWx0c2FsdGdBQUFBQUJs"
    );
    assert_eq!(
        parse_transform_response(TransformDirection::Inverse, &decrypted)
            .expect("decrypt fixture should parse"),
        "secret"
    );
}

#[test]
fn client_built_transform_bodies_match_schemas() {
    for (direction, schema) in [
        (TransformDirection::Forward, "encrypt-request"),
        (TransformDirection::Inverse, "decrypt-request"),
    ] {
        let body = TransformRequest::new(direction, "payload", "pw")
            .to_json_bytes()
            .expect("body should serialize");
        let value: Value = serde_json::from_slice(&body).expect("body should be JSON");
        assert!(
            compile_validator(schema).is_valid(&value),
            "{} body should validate against {schema} schema",
            direction.as_str()
        );
    }
}
