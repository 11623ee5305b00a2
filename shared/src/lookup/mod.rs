//! Single-shot third-party lookups.
//!
//! Each lookup is split into pure request builders and response translators;
//! the app sends the built [`LookupRequest`] through `crux_http` and feeds the
//! decoded response back in. Every outcome collapses to a [`LookupReply`] with the
//! status and `{ "error": ... }` body the dashboard widgets expect.

pub mod diagnosis;
pub mod drug;
pub mod nutrition;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::warn;

use crate::capabilities::{HttpResult, ValidatedUrl};
use crate::{AppError, ErrorKind};

pub use self::diagnosis::{DiagnosisForm, DiagnosisPatient, DiagnosisResult};
pub use self::drug::DrugInfo;
pub use self::nutrition::{FoodItem, NutritionReport, SearchHit};

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{status}: {message}")]
pub struct LookupFailure {
    pub status: u16,
    pub message: String,
}

impl LookupFailure {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from_http_status(self.status)
    }
}

impl From<LookupFailure> for AppError {
    fn from(failure: LookupFailure) -> Self {
        AppError::new(failure.kind(), failure.message.clone())
            .with_context("http_status", failure.status.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMethod {
    Get,
    Post,
}

/// An outbound lookup call, validated but not yet handed to the shell.
#[derive(Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub method: LookupMethod,
    pub url: ValidatedUrl,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Vec<u8>>,
}

impl LookupRequest {
    pub(crate) fn get(url: ValidatedUrl) -> Self {
        Self {
            method: LookupMethod::Get,
            url,
            headers: vec![("Accept", "application/json".to_string())],
            body: None,
        }
    }

    pub(crate) fn post_json(url: ValidatedUrl, body: &Value) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(body)?;
        Ok(Self {
            method: LookupMethod::Post,
            url,
            headers: vec![
                ("Accept", "application/json".to_string()),
                ("Content-Type", "application/json".to_string()),
            ],
            body: Some(body),
        })
    }

    #[must_use]
    pub(crate) fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

// Header values carry credentials and query strings carry the FDC key.
impl fmt::Debug for LookupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.headers.iter().map(|(n, _)| *n).collect();
        f.debug_struct("LookupRequest")
            .field("method", &self.method)
            .field("url", &self.url.redacted())
            .field("headers", &names)
            .field("body_len", &self.body.as_ref().map_or(0, Vec::len))
            .finish()
    }
}

/// The `(status, JSON body)` pair a lookup resolves to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupReply {
    pub status: u16,
    pub body: Value,
}

impl LookupReply {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn failure(failure: &LookupFailure) -> Self {
        Self {
            status: failure.status,
            body: json!({ "error": failure.message }),
        }
    }

    pub fn from_result<T: Serialize>(result: &Result<T, LookupFailure>) -> Self {
        match result {
            Ok(value) => match serde_json::to_value(value) {
                Ok(body) => Self::ok(body),
                Err(e) => Self::failure(&LookupFailure::new(500, e.to_string())),
            },
            Err(failure) => Self::failure(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}

/// Unwraps an upstream reply into JSON. Transport errors, non-2xx statuses,
/// unparseable and missing bodies all become a 500 carrying `message`.
pub(crate) fn upstream_json(
    result: HttpResult,
    step: &'static str,
    message: &'static str,
) -> Result<Value, LookupFailure> {
    let mut response = result.map_err(|err| {
        warn!(step, error = %err, "upstream request failed");
        LookupFailure::new(500, message)
    })?;

    let status = response.status();
    if !status.is_success() {
        warn!(step, status = u16::from(status), "upstream returned an error status");
        return Err(LookupFailure::new(500, message));
    }

    response.take_body().ok_or_else(|| {
        warn!(step, "upstream reply had no body");
        LookupFailure::new(500, message)
    })
}
