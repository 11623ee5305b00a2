use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{upstream_json, LookupFailure, LookupRequest};
use crate::capabilities::{HttpResult, ValidatedUrl};
use crate::event::ApiKey;

pub const QUERY_REQUIRED: &str = "Food query is required";
pub const SERVICE_UNAVAILABLE: &str = "Nutrition service temporarily unavailable";
pub const FETCH_FAILED: &str = "Failed to fetch nutrition data. Please try again.";

const SERVING: &str = "100 g";
const UNKNOWN_FOOD: &str = "Unknown Food";

/// The top search match, carried into the detail step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub fdc_id: u64,
    pub description: Option<String>,
}

/// Macros per 100 g. `id` is the FoodData Central id of the match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub id: u64,
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub serving: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionReport {
    pub foods: Vec<FoodItem>,
}

/// Step one: `GET <base>/foods/search?api_key=..&query=..&pageSize=1`.
pub fn search_request(
    base_url: &str,
    api_key: Option<&ApiKey>,
    query: &str,
) -> Result<LookupRequest, LookupFailure> {
    let query = query.trim();
    if query.is_empty() {
        return Err(LookupFailure::new(400, QUERY_REQUIRED));
    }
    let api_key = api_key.ok_or_else(|| {
        warn!("nutrition lookup attempted without an FDC API key");
        LookupFailure::new(503, SERVICE_UNAVAILABLE)
    })?;

    let url = ValidatedUrl::build(
        base_url,
        &["foods", "search"],
        &[
            ("api_key", api_key.expose()),
            ("query", query),
            ("pageSize", "1"),
        ],
    )
    .map_err(|err| {
        debug!(error = %err, "could not build FDC search URL");
        LookupFailure::new(500, FETCH_FAILED)
    })?;

    info!(url = %url.redacted(), "searching foods");
    Ok(LookupRequest::get(url))
}

/// `None` means the search matched nothing, which is a successful empty report.
pub fn translate_search(result: HttpResult) -> Result<Option<SearchHit>, LookupFailure> {
    let body = upstream_json(result, "fdc_search", FETCH_FAILED)?;

    let hit = body
        .get("foods")
        .and_then(Value::as_array)
        .and_then(|foods| foods.first())
        .and_then(|first| {
            let fdc_id = first.get("fdcId").and_then(Value::as_u64).filter(|id| *id > 0)?;
            Some(SearchHit {
                fdc_id,
                description: non_empty_str(first, "description"),
            })
        });
    Ok(hit)
}

/// Step two: `GET <base>/food/<fdcId>?api_key=..`.
pub fn detail_request(
    base_url: &str,
    api_key: Option<&ApiKey>,
    hit: &SearchHit,
) -> Result<LookupRequest, LookupFailure> {
    let api_key = api_key.ok_or_else(|| LookupFailure::new(503, SERVICE_UNAVAILABLE))?;
    let id = hit.fdc_id.to_string();
    let url = ValidatedUrl::build(
        base_url,
        &["food", id.as_str()],
        &[("api_key", api_key.expose())],
    )
    .map_err(|err| {
        debug!(error = %err, "could not build FDC detail URL");
        LookupFailure::new(500, FETCH_FAILED)
    })?;

    info!(url = %url.redacted(), "fetching food detail");
    Ok(LookupRequest::get(url))
}

pub fn translate_detail(hit: &SearchHit, result: HttpResult) -> Result<FoodItem, LookupFailure> {
    let detail = upstream_json(result, "fdc_detail", FETCH_FAILED)?;

    let name = non_empty_str(&detail, "description")
        .or_else(|| hit.description.clone())
        .unwrap_or_else(|| UNKNOWN_FOOD.to_string());

    // Branded foods carry label values; others only have the nutrient list.
    let (calories, protein, carbs, fat) = match detail.get("labelNutrients") {
        Some(label) if !label.is_null() => (
            label_value(label, "calories"),
            label_value(label, "protein"),
            label_value(label, "carbohydrates"),
            label_value(label, "fat"),
        ),
        _ => {
            let nutrients = detail
                .get("foodNutrients")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            (
                nutrient_amount(nutrients, "energy"),
                nutrient_amount(nutrients, "protein"),
                nutrient_amount(nutrients, "carbohydrate"),
                nutrient_amount(nutrients, "fat"),
            )
        }
    };

    Ok(FoodItem {
        id: hit.fdc_id,
        name,
        calories,
        protein,
        carbs,
        fat,
        serving: SERVING.to_string(),
    })
}

fn label_value(label: &Value, key: &str) -> f64 {
    finite(label.get(key).and_then(|n| n.get("value")).and_then(Value::as_f64))
}

/// First nutrient whose name contains `needle`, case-insensitively.
fn nutrient_amount(nutrients: &[Value], needle: &str) -> f64 {
    let amount = nutrients
        .iter()
        .find(|n| {
            n.pointer("/nutrient/name")
                .and_then(Value::as_str)
                .is_some_and(|name| name.to_lowercase().contains(needle))
        })
        .and_then(|n| n.get("amount"))
        .and_then(Value::as_f64);
    finite(amount)
}

fn finite(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn non_empty_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::testing::{ok, status};
    use crate::DEFAULT_FDC_BASE_URL;
    use crux_http::http::StatusCode;
    use serde_json::json;

    fn key() -> ApiKey {
        ApiKey::new("fdc-secret")
    }

    fn hit() -> SearchHit {
        SearchHit {
            fdc_id: 171_705,
            description: Some("Apples, raw".into()),
        }
    }

    #[test]
    fn search_requires_query_then_key() {
        assert_eq!(
            search_request(DEFAULT_FDC_BASE_URL, None, " "),
            Err(LookupFailure::new(400, QUERY_REQUIRED))
        );
        assert_eq!(
            search_request(DEFAULT_FDC_BASE_URL, None, "apple"),
            Err(LookupFailure::new(503, SERVICE_UNAVAILABLE))
        );
    }

    #[test]
    fn search_url_carries_key_but_log_form_does_not() {
        let key = key();
        let req = search_request(DEFAULT_FDC_BASE_URL, Some(&key), "apple pie").expect("request");
        let url = req.url.as_str();
        assert!(url.starts_with("https://api.nal.usda.gov/fdc/v1/foods/search?"));
        assert!(url.contains("api_key=fdc-secret"));
        assert!(url.contains("query=apple+pie"));
        assert!(url.contains("pageSize=1"));
        assert!(!req.url.redacted().contains("fdc-secret"));
        assert!(!format!("{req:?}").contains("fdc-secret"));
    }

    #[test]
    fn detail_url_uses_fdc_id() {
        let key = key();
        let req = detail_request(DEFAULT_FDC_BASE_URL, Some(&key), &hit()).expect("request");
        assert!(req
            .url
            .as_str()
            .starts_with("https://api.nal.usda.gov/fdc/v1/food/171705?api_key="));
    }

    #[test]
    fn search_without_foods_is_empty_hit() {
        let body = json!({ "foods": [] });
        assert_eq!(translate_search(ok(body)), Ok(None));
        let body = json!({ "foods": [{ "description": "no id" }] });
        assert_eq!(translate_search(ok(body)), Ok(None));
    }

    #[test]
    fn search_picks_first_food() {
        let body = json!({ "foods": [
            { "fdcId": 171705, "description": "Apples, raw" },
            { "fdcId": 2, "description": "Other" }
        ]});
        assert_eq!(
            translate_search(ok(body)),
            Ok(Some(hit()))
        );
    }

    #[test]
    fn detail_prefers_label_nutrients() {
        let body = json!({
            "description": "Granola Bar",
            "labelNutrients": {
                "calories": { "value": 190.0 },
                "protein": { "value": 4 },
                "fat": { "value": 7.5 }
            },
            "foodNutrients": [{ "nutrient": { "name": "Energy" }, "amount": 999 }]
        });
        let item = translate_detail(&hit(), ok(body)).expect("item");
        assert_eq!(item.name, "Granola Bar");
        assert_eq!(item.id, 171_705);
        assert!((item.calories - 190.0).abs() < f64::EPSILON);
        assert!((item.protein - 4.0).abs() < f64::EPSILON);
        assert!(item.carbs.abs() < f64::EPSILON);
        assert!((item.fat - 7.5).abs() < f64::EPSILON);
        assert_eq!(item.serving, "100 g");
    }

    #[test]
    fn detail_derives_from_food_nutrients() {
        let body = json!({
            "foodNutrients": [
                { "nutrient": { "name": "Protein" }, "amount": 0.26 },
                { "nutrient": { "name": "Total lipid (fat)" }, "amount": 0.17 },
                { "nutrient": { "name": "Carbohydrate, by difference" }, "amount": 13.8 },
                { "nutrient": { "name": "Energy" }, "amount": 52 }
            ]
        });
        let item = translate_detail(&hit(), ok(body)).expect("item");
        assert_eq!(item.name, "Apples, raw");
        assert!((item.calories - 52.0).abs() < f64::EPSILON);
        assert!((item.protein - 0.26).abs() < f64::EPSILON);
        assert!((item.carbs - 13.8).abs() < f64::EPSILON);
        assert!((item.fat - 0.17).abs() < f64::EPSILON);
    }

    #[test]
    fn detail_falls_back_to_unknown_food() {
        let hit = SearchHit {
            fdc_id: 1,
            description: None,
        };
        let item = translate_detail(&hit, ok(json!({}))).expect("item");
        assert_eq!(item.name, "Unknown Food");
        assert!(item.calories.abs() < f64::EPSILON);
    }

    #[test]
    fn detail_failure_is_500() {
        assert_eq!(
            translate_detail(&hit(), status(StatusCode::InternalServerError, json!({}))),
            Err(LookupFailure::new(500, FETCH_FAILED))
        );
    }
}
