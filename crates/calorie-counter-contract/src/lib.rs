#![warn(missing_docs)]
//! # calorie-counter-contract
//!
//! ## Purpose
//! Defines the wire contract of the analysis and transform endpoints and the
//! client-side interpretation of their responses.
//!
//! ## Responsibilities
//! - Name the endpoint paths, the multipart field and per-endpoint fallback
//!   messages.
//! - Build the JSON bodies for the forward (encrypt) and inverse (decrypt)
//!   transform calls.
//! - Interpret a 2xx analyze body as a recognized record or a semantic miss,
//!   giving `message` precedence over record fields.
//! - Read transform results from their direction-specific fields.
//!
//! ## Data flow
//! Raw response bytes -> [`parse_analyze_response`] /
//! [`parse_transform_response`] -> controller outcome.
//!
//! ## Ownership and lifetimes
//! Parsed values are owned so they can outlive the transport buffer and cross
//! worker threads.
//!
//! ## Error model
//! Invalid JSON or missing fields return [`ContractError`]; callers treat it as
//! a malformed-body transport failure.
//!
//! ## Security and privacy notes
//! Request types carry the passphrase; their `Debug` output redacts it.

use std::fmt;

use calorie_counter_core::NOTHING_RECOGNIZED_MESSAGE;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Path of the image analysis endpoint.
pub const ANALYZE_PATH: &str = "/api/analyze";
/// Path of the forward transform endpoint.
pub const ENCRYPT_PATH: &str = "/api/encrypt";
/// Path of the inverse transform endpoint.
pub const DECRYPT_PATH: &str = "/api/decrypt";

/// Multipart field that carries the image bytes.
pub const ANALYZE_IMAGE_FIELD: &str = "image";

/// Fallback message for failed analyze calls.
pub const ANALYZE_FALLBACK_MESSAGE: &str = "Failed to analyze image.";
/// Fallback message for failed encrypt calls.
pub const ENCRYPT_FALLBACK_MESSAGE: &str = "Encryption failed";
/// Fallback message for failed decrypt calls.
pub const DECRYPT_FALLBACK_MESSAGE: &str = "Decryption failed";

/// Nutrition values of the first recognized food item.
///
/// Values are kept as text; the service forwards whatever its upstream
/// reports and the client only requires presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutritionRecord {
    /// Recognized food name.
    #[serde(alias = "foodName", deserialize_with = "text_value")]
    pub food_name: String,
    /// Energy in kilocalories.
    #[serde(deserialize_with = "text_value")]
    pub calories: String,
    /// Protein in grams.
    #[serde(deserialize_with = "text_value")]
    pub protein: String,
    /// Fat in grams.
    #[serde(deserialize_with = "text_value")]
    pub fat: String,
    /// Carbohydrates in grams.
    #[serde(alias = "carbohydrate", deserialize_with = "text_value")]
    pub carbs: String,
}

/// Interpretation of a 2xx analyze response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzeOutcome {
    /// The service recognized food and returned its nutrition values.
    Recognized(NutritionRecord),
    /// The service explicitly reported that nothing was recognized.
    NothingRecognized(String),
}

/// Parses a 2xx analyze body.
///
/// A present, non-null `message` field wins over any record fields.
///
/// # Errors
/// Returns [`ContractError::Decode`] for invalid JSON or missing record
/// fields, and [`ContractError::InvalidContract`] for non-object bodies.
pub fn parse_analyze_response(raw: &[u8]) -> Result<AnalyzeOutcome, ContractError> {
    let parsed: Value = serde_json::from_slice(raw)?;
    if !parsed.is_object() {
        return Err(ContractError::InvalidContract(
            "analyze response is not a JSON object".to_string(),
        ));
    }

    match parsed.get("message") {
        Some(Value::Null) | None => {}
        Some(message) => {
            let text = match message {
                Value::String(text) => text.trim().to_string(),
                other => other.to_string(),
            };
            let text = if text.is_empty() {
                NOTHING_RECOGNIZED_MESSAGE.to_string()
            } else {
                text
            };
            return Ok(AnalyzeOutcome::NothingRecognized(text));
        }
    }

    let record: NutritionRecord = serde_json::from_value(parsed)?;
    Ok(AnalyzeOutcome::Recognized(record))
}

/// Direction of a transform call, always chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformDirection {
    /// Encrypt plain text.
    Forward,
    /// Decrypt previously encrypted text.
    Inverse,
}

impl TransformDirection {
    /// Endpoint path for this direction.
    pub fn path(self) -> &'static str {
        match self {
            Self::Forward => ENCRYPT_PATH,
            Self::Inverse => DECRYPT_PATH,
        }
    }

    /// Fallback message used when a failure carries no detail.
    pub fn fallback_message(self) -> &'static str {
        match self {
            Self::Forward => ENCRYPT_FALLBACK_MESSAGE,
            Self::Inverse => DECRYPT_FALLBACK_MESSAGE,
        }
    }

    /// Short label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "encrypt",
            Self::Inverse => "decrypt",
        }
    }
}

/// Body of the encrypt call.
///
/// Serialized as `{"text", "password"}`, the keys the deployed service reads.
/// The passphrase travels under `password`, not `passphrase`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptRequest {
    /// Plain text to encrypt.
    pub text: String,
    /// Passphrase used for key derivation.
    pub password: String,
}

/// Body of the decrypt call.
///
/// Serialized as `{"encrypted_text", "password"}`, the keys the deployed
/// service reads. Snake case is kept on the wire even though replies may
/// also arrive in camel case.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptRequest {
    /// Token produced by a previous encrypt call.
    pub encrypted_text: String,
    /// Passphrase used for key derivation.
    pub password: String,
}

impl fmt::Debug for EncryptRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptRequest")
            .field("text_len", &self.text.len())
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for DecryptRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptRequest")
            .field("encrypted_text_len", &self.encrypted_text.len())
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Transform request for either direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TransformRequest {
    /// Forward call body.
    Encrypt(EncryptRequest),
    /// Inverse call body.
    Decrypt(DecryptRequest),
}

impl TransformRequest {
    /// Builds the body for `direction`; `text` is the input of that direction.
    pub fn new(direction: TransformDirection, text: &str, passphrase: &str) -> Self {
        match direction {
            TransformDirection::Forward => Self::Encrypt(EncryptRequest {
                text: text.to_string(),
                password: passphrase.to_string(),
            }),
            TransformDirection::Inverse => Self::Decrypt(DecryptRequest {
                encrypted_text: text.to_string(),
                password: passphrase.to_string(),
            }),
        }
    }

    /// Direction of this request.
    pub fn direction(&self) -> TransformDirection {
        match self {
            Self::Encrypt(_) => TransformDirection::Forward,
            Self::Decrypt(_) => TransformDirection::Inverse,
        }
    }

    /// Serializes the body to compact JSON bytes.
    ///
    /// # Errors
    /// Returns [`ContractError::Decode`] when serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, ContractError> {
        serde_json::to_vec(self).map_err(ContractError::Decode)
    }
}

/// Body of a successful encrypt call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptResponse {
    /// URL-safe token containing salt and ciphertext.
    #[serde(alias = "encryptedText")]
    pub encrypted_text: String,
}

/// Body of a successful decrypt call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptResponse {
    /// Recovered plain text.
    #[serde(alias = "decryptedText")]
    pub decrypted_text: String,
}

/// Reads the opaque result string of a 2xx transform body.
///
/// # Errors
/// Returns [`ContractError::Decode`] when the direction's field is missing or
/// the body is not JSON.
pub fn parse_transform_response(
    direction: TransformDirection,
    raw: &[u8],
) -> Result<String, ContractError> {
    let result = match direction {
        TransformDirection::Forward => {
            serde_json::from_slice::<EncryptResponse>(raw)?.encrypted_text
        }
        TransformDirection::Inverse => {
            serde_json::from_slice::<DecryptResponse>(raw)?.decrypted_text
        }
    };
    Ok(result)
}

/// Wire contract errors.
#[derive(Debug, Error)]
pub enum ContractError {
    /// JSON encode/decode failure.
    #[error("contract decode failure: {0}")]
    Decode(#[from] serde_json::Error),
    /// Payload is valid JSON but violates the contract shape.
    #[error("contract violation: {0}")]
    InvalidContract(String),
}

fn text_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Null => Err(de::Error::custom("nutrition value is null")),
        other => Err(de::Error::custom(format!(
            "nutrition value must be text or number, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for response interpretation.

    use super::*;

    #[test]
    fn message_takes_precedence_over_record_fields() {
        let raw = br#"{
            "message":"No food detected in the image.",
            "food_name":"apple","calories":"95","protein":"0.5","fat":"0.3","carbs":"25"
        }"#;
        assert_eq!(
            parse_analyze_response(raw).expect("body should parse"),
            AnalyzeOutcome::NothingRecognized("No food detected in the image.".to_string())
        );
    }

    #[test]
    fn numeric_values_are_kept_as_text() {
        let raw = br#"{"foodName":"banana","calories":105,"protein":1.3,"fat":0.4,"carbs":27}"#;
        let AnalyzeOutcome::Recognized(record) =
            parse_analyze_response(raw).expect("body should parse")
        else {
            panic!("expected a recognized record");
        };
        assert_eq!(record.food_name, "banana");
        assert_eq!(record.calories, "105");
        assert_eq!(record.protein, "1.3");
    }

    #[test]
    fn passphrase_is_redacted_in_debug_output() {
        let request = TransformRequest::new(TransformDirection::Forward, "secret", "pw-123");
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("pw-123"));
        assert!(!rendered.contains("secret"));
    }
}
