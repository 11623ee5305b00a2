use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::{upstream_json, LookupFailure, LookupRequest};
use crate::capabilities::{HttpResult, ValidatedUrl};

pub const NAME_REQUIRED: &str = "Drug name is required";
pub const NOT_FOUND: &str = "Drug not found in FDA database";
pub const FETCH_FAILED: &str = "Failed to fetch drug information. Please try again later.";

/// Label summary for one branded drug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugInfo {
    pub brand_name: String,
    pub generic_name: String,
    pub purpose: String,
    pub warnings: String,
    pub dosage: String,
    pub interactions: String,
    pub side_effects: String,
}

/// `GET <base>/drug/label.json?search=openfda.brand_name:"<name>"&limit=1`
pub fn request(base_url: &str, name: &str) -> Result<LookupRequest, LookupFailure> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LookupFailure::new(400, NAME_REQUIRED));
    }

    let search = format!("openfda.brand_name:\"{name}\"");
    let url = ValidatedUrl::build(
        base_url,
        &["drug", "label.json"],
        &[("search", search.as_str()), ("limit", "1")],
    )
    .map_err(|err| {
        debug!(error = %err, "could not build FDA URL");
        LookupFailure::new(500, FETCH_FAILED)
    })?;

    info!(url = %url.redacted(), "requesting drug label");
    Ok(LookupRequest::get(url))
}

pub fn translate(result: HttpResult) -> Result<DrugInfo, LookupFailure> {
    let body = upstream_json(result, "fda_label", FETCH_FAILED)?;

    let Some(label) = body
        .get("results")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
    else {
        return Err(LookupFailure::new(404, NOT_FOUND));
    };

    Ok(DrugInfo {
        brand_name: first_or(label, "/openfda/brand_name/0", "N/A"),
        generic_name: first_or(label, "/openfda/generic_name/0", "N/A"),
        purpose: first_or(label, "/purpose/0", "N/A"),
        warnings: first_or(label, "/warnings/0", "No warnings available"),
        dosage: first_or(label, "/dosage_and_administration/0", "Consult physician"),
        interactions: first_or(label, "/drug_interactions/0", "No interactions listed"),
        side_effects: first_or(label, "/adverse_reactions/0", "No side effects listed"),
    })
}

// Label sections are arrays of paragraphs; only the first is shown.
fn first_or(label: &Value, pointer: &str, fallback: &str) -> String {
    label
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .unwrap_or(fallback)
        .to_string()
}
