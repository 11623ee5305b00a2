//! Interpretation of generative flow replies.
//!
//! The flow service is asked for JSON but does not always comply, so every
//! reply arrives here as raw text. Summaries must parse; presence detection
//! never fails and degrades to a keyword heuristic.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::capture::ClassificationResult;
use crate::{AppError, ErrorKind};

pub const DETECTION_FALLBACK_MESSAGE: &str =
    "Could not reliably determine if a person was present from the response.";
pub const SYMPTOMS_MISSING_MESSAGE: &str = "Please describe your symptoms.";
pub const SYMPTOMS_EMPTY_MESSAGE: &str =
    "Failed to get insights. The AI could not process the request.";
pub const MEDIA_MISSING_MESSAGE: &str = "No image provided. Please upload an image.";
pub const MEDIA_EMPTY_MESSAGE: &str =
    "Failed to generate summary. The AI could not process the request.";

const KEYWORD_HIT_CONFIDENCE: f32 = 0.7;
const KEYWORD_MISS_CONFIDENCE: f32 = 0.3;

const DETECTION_KEYS: [&str; 3] = ["humanDetected", "personDetected", "present"];
const SYMPTOM_KEYS: [&str; 2] = ["possibleConditions", "summaryText"];
const MEDIA_KEYS: [&str; 2] = ["summary", "summaryText"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FlowParseError {
    #[error("flow reply is not structured: {reason}")]
    Malformed { reason: String },

    #[error("flow reply carried no content")]
    Empty,
}

impl FlowParseError {
    /// `empty_message` is the form-specific text shown when the flow answered
    /// with nothing usable.
    pub fn into_app_error(self, empty_message: &str) -> AppError {
        match self {
            FlowParseError::Malformed { .. } => AppError::new(
                ErrorKind::MalformedResponse,
                "An unexpected error occurred. Please try again later.",
            )
            .with_internal(self.to_string()),
            FlowParseError::Empty => {
                AppError::new(ErrorKind::Internal, empty_message).with_internal(self.to_string())
            }
        }
    }
}

pub fn parse_symptom_summary(raw: &str) -> Result<String, FlowParseError> {
    parse_summary(raw, &SYMPTOM_KEYS)
}

pub fn parse_media_summary(raw: &str) -> Result<String, FlowParseError> {
    parse_summary(raw, &MEDIA_KEYS)
}

fn parse_summary(raw: &str, keys: &[&str]) -> Result<String, FlowParseError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(FlowParseError::Empty);
    }

    let value: Value = serde_json::from_str(body).map_err(|e| FlowParseError::Malformed {
        reason: e.to_string(),
    })?;

    let text = match &value {
        Value::Object(fields) => first_string(fields, keys).ok_or_else(|| {
            FlowParseError::Malformed {
                reason: format!("expected one of {keys:?}"),
            }
        })?,
        Value::String(text) => text.as_str(),
        other => {
            return Err(FlowParseError::Malformed {
                reason: format!("unexpected JSON {}", json_type(other)),
            })
        }
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(FlowParseError::Empty);
    }
    Ok(text.to_string())
}

/// Presence detection from an untrusted reply. Structured JSON wins; anything
/// else is classified by whether it mentions a person.
pub fn parse_detection(raw: &str) -> ClassificationResult {
    if let Some(result) = structured_detection(raw) {
        return result;
    }

    let text = raw.trim();
    let lowered = text.to_lowercase();
    let detected = lowered.contains("person") || lowered.contains("human");
    debug!(detected, "detection reply was not structured, using keywords");

    ClassificationResult {
        detected,
        confidence: Some(if detected {
            KEYWORD_HIT_CONFIDENCE
        } else {
            KEYWORD_MISS_CONFIDENCE
        }),
        message: if text.is_empty() {
            DETECTION_FALLBACK_MESSAGE.to_string()
        } else {
            text.to_string()
        },
    }
}

fn structured_detection(raw: &str) -> Option<ClassificationResult> {
    let value: Value = serde_json::from_str(strip_code_fence(raw)).ok()?;
    let fields = value.as_object()?;
    let detected = DETECTION_KEYS
        .iter()
        .find_map(|key| fields.get(*key).and_then(Value::as_bool))?;

    #[allow(clippy::cast_possible_truncation)]
    let confidence = fields
        .get("confidence")
        .and_then(Value::as_f64)
        .map(|c| c.clamp(0.0, 1.0) as f32);

    let message = fields
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DETECTION_FALLBACK_MESSAGE)
        .to_string();

    Some(ClassificationResult {
        detected,
        confidence,
        message,
    })
}

fn first_string<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| fields.get(*key).and_then(Value::as_str))
}

// Models often wrap JSON in a ```json fence.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
