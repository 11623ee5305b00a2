use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{upstream_json, LookupFailure, LookupRequest};
use crate::capabilities::{HttpResult, ValidatedUrl};
use crate::event::ApiKey;

pub const FIELDS_REQUIRED: &str = "Symptoms, age, and gender are required";
pub const SERVICE_UNAVAILABLE: &str = "Symptom checker service temporarily unavailable";
pub const ANALYSIS_FAILED: &str = "Failed to analyze symptoms. Please try again.";

/// Raw form input. Age stays a string until validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisForm {
    pub symptoms: String,
    pub age: String,
    pub gender: String,
}

/// Validated demographics, carried from the parse step to the diagnosis step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisPatient {
    pub sex: String,
    pub age: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisCondition {
    pub id: String,
    pub name: String,
    pub common_name: Option<String>,
    pub probability: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisQuestion {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisResult {
    pub conditions: Vec<DiagnosisCondition>,
    pub question: Option<DiagnosisQuestion>,
    pub should_stop: Option<bool>,
}

pub type Credentials<'a> = (&'a ApiKey, &'a ApiKey);

/// Step one: `POST <base>/parse` with the free-text symptoms.
pub fn parse_request(
    base_url: &str,
    credentials: Option<Credentials<'_>>,
    form: &DiagnosisForm,
) -> Result<(LookupRequest, DiagnosisPatient), LookupFailure> {
    let symptoms = form.symptoms.trim();
    let sex = form.gender.trim();
    let age = parse_age(&form.age);
    let (false, false, Some(age)) = (symptoms.is_empty(), sex.is_empty(), age) else {
        return Err(LookupFailure::new(400, FIELDS_REQUIRED));
    };

    let credentials = credentials.ok_or_else(|| {
        warn!("symptom diagnosis attempted without Infermedica credentials");
        LookupFailure::new(503, SERVICE_UNAVAILABLE)
    })?;

    let request = post(base_url, "parse", credentials, &json!({ "text": symptoms }))?;
    Ok((
        request,
        DiagnosisPatient {
            sex: sex.to_string(),
            age,
        },
    ))
}

/// Extracts the evidence ids from the parse reply.
pub fn translate_parse(result: HttpResult) -> Result<Vec<String>, LookupFailure> {
    let body = upstream_json(result, "infermedica_parse", ANALYSIS_FAILED)?;
    let mentions = body
        .get("mentions")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            warn!("parse reply had no mentions");
            LookupFailure::new(500, ANALYSIS_FAILED)
        })?;

    let ids: Vec<String> = mentions
        .iter()
        .filter_map(|m| m.get("id").and_then(Value::as_str))
        .map(str::to_string)
        .collect();
    debug!(mentions = ids.len(), "symptoms parsed");
    Ok(ids)
}

/// Step two: `POST <base>/diagnosis` marking every parsed mention present.
pub fn diagnosis_request(
    base_url: &str,
    credentials: Option<Credentials<'_>>,
    patient: &DiagnosisPatient,
    evidence: &[String],
) -> Result<LookupRequest, LookupFailure> {
    let credentials = credentials.ok_or_else(|| LookupFailure::new(503, SERVICE_UNAVAILABLE))?;
    let evidence: Vec<Value> = evidence
        .iter()
        .map(|id| json!({ "id": id, "choice_id": "present" }))
        .collect();
    let body = json!({
        "sex": patient.sex,
        "age": { "value": patient.age },
        "evidence": evidence,
    });
    post(base_url, "diagnosis", credentials, &body)
}

pub fn translate_diagnosis(result: HttpResult) -> Result<DiagnosisResult, LookupFailure> {
    let body = upstream_json(result, "infermedica_diagnosis", ANALYSIS_FAILED)?;
    serde_json::from_value(body).map_err(|err| {
        warn!(error = %err, "diagnosis reply did not match the expected shape");
        LookupFailure::new(500, ANALYSIS_FAILED)
    })
}

fn post(
    base_url: &str,
    endpoint: &str,
    (app_id, app_key): Credentials<'_>,
    body: &Value,
) -> Result<LookupRequest, LookupFailure> {
    let failed = |err: &dyn std::fmt::Display| {
        debug!(endpoint, error = %err, "could not build Infermedica request");
        LookupFailure::new(500, ANALYSIS_FAILED)
    };

    let url = ValidatedUrl::build(base_url, &[endpoint], &[]).map_err(|e| failed(&e))?;
    info!(url = %url.redacted(), "calling symptom service");
    let request = LookupRequest::post_json(url, body).map_err(|e| failed(&e))?;
    Ok(request
        .with_header("App-Id", app_id.expose())
        .with_header("App-Key", app_key.expose()))
}

/// Leading decimal digits, as a form's integer parse would read them.
fn parse_age(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}
