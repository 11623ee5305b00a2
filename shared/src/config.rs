use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::binder::QueryIdentity;
use crate::event::ApiKey;
use crate::{
    DEFAULT_FDA_BASE_URL, DEFAULT_FDC_BASE_URL, DEFAULT_INFERMEDICA_BASE_URL,
    DEFAULT_JPEG_QUALITY, DEFAULT_PATIENT_ID, DEFAULT_SCAN_CEILING_MS, HEALTH_METRICS_PATH,
    MAX_SCAN_CEILING_MS, MEDICATIONS_PATH, MIN_SCAN_CEILING_MS, PATIENT_PROFILES_PATH,
};

/// What to do with a classification that arrives after the scan ceiling
/// already settled the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LateResultPolicy {
    #[default]
    Apply,
    Discard,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("configuration is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be a single path segment, got '{value}'")]
    InvalidSegment { field: &'static str, value: String },

    #[error("{field} is not a valid http(s) URL: {reason}")]
    InvalidUrl { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub patient_id: String,
    pub patient_profiles_path: String,
    pub medications_path: String,
    pub health_metrics_path: String,
    pub scan_ceiling_ms: u64,
    pub jpeg_quality: u8,
    pub late_result_policy: LateResultPolicy,
    pub fda_base_url: String,
    pub fdc_base_url: String,
    pub infermedica_base_url: String,
    pub fdc_api_key: Option<ApiKey>,
    pub infermedica_app_id: Option<ApiKey>,
    pub infermedica_app_key: Option<ApiKey>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            patient_id: DEFAULT_PATIENT_ID.to_string(),
            patient_profiles_path: PATIENT_PROFILES_PATH.to_string(),
            medications_path: MEDICATIONS_PATH.to_string(),
            health_metrics_path: HEALTH_METRICS_PATH.to_string(),
            scan_ceiling_ms: DEFAULT_SCAN_CEILING_MS,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            late_result_policy: LateResultPolicy::default(),
            fda_base_url: DEFAULT_FDA_BASE_URL.to_string(),
            fdc_base_url: DEFAULT_FDC_BASE_URL.to_string(),
            infermedica_base_url: DEFAULT_INFERMEDICA_BASE_URL.to_string(),
            fdc_api_key: None,
            infermedica_app_id: None,
            infermedica_app_key: None,
        }
    }
}

impl DashboardConfig {
    /// Parses shell-supplied JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidJson(e.to_string()))?;
        config.validate()?;
        Ok(config.validated())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::check_segment("patient_id", &self.patient_id)?;
        Self::check_path("patient_profiles_path", &self.patient_profiles_path)?;
        Self::check_path("medications_path", &self.medications_path)?;
        Self::check_path("health_metrics_path", &self.health_metrics_path)?;
        Self::check_url("fda_base_url", &self.fda_base_url)?;
        Self::check_url("fdc_base_url", &self.fdc_base_url)?;
        Self::check_url("infermedica_base_url", &self.infermedica_base_url)?;
        Ok(())
    }

    /// Clamps tunables into their supported ranges and drops blank keys.
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.scan_ceiling_ms = self
            .scan_ceiling_ms
            .clamp(MIN_SCAN_CEILING_MS, MAX_SCAN_CEILING_MS);
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        for key in [
            &mut self.fdc_api_key,
            &mut self.infermedica_app_id,
            &mut self.infermedica_app_key,
        ] {
            if key.as_ref().is_some_and(ApiKey::is_blank) {
                *key = None;
            }
        }
        self
    }

    pub fn profile_query(&self) -> QueryIdentity {
        QueryIdentity::document(format!(
            "{}/{}",
            self.patient_profiles_path, self.patient_id
        ))
    }

    pub fn medications_query(&self) -> QueryIdentity {
        QueryIdentity::collection(self.medications_path.clone())
    }

    pub fn health_metrics_query(&self) -> QueryIdentity {
        QueryIdentity::collection(self.health_metrics_path.clone())
    }

    pub fn infermedica_credentials(&self) -> Option<(&ApiKey, &ApiKey)> {
        match (&self.infermedica_app_id, &self.infermedica_app_key) {
            (Some(id), Some(key)) => Some((id, key)),
            _ => None,
        }
    }

    fn check_segment(field: &'static str, value: &str) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::Empty { field });
        }
        if value.contains('/') {
            return Err(ConfigError::InvalidSegment {
                field,
                value: value.to_string(),
            });
        }
        Ok(())
    }

    fn check_path(field: &'static str, value: &str) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::Empty { field });
        }
        Ok(())
    }

    fn check_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
        let parsed = Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
            field,
            reason: e.to_string(),
        })?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(ConfigError::InvalidUrl {
                field,
                reason: format!("unsupported scheme '{other}'"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard() {
        let config = DashboardConfig::default();
        assert_eq!(config.scan_ceiling_ms, 3_000);
        assert_eq!(config.jpeg_quality, 80);
        assert_eq!(config.late_result_policy, LateResultPolicy::Apply);
        assert_eq!(
            config.profile_query(),
            QueryIdentity::document("patientProfiles/jane-doe")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn from_json_fills_defaults() {
        let config = DashboardConfig::from_json(r#"{"patient_id": "john-roe"}"#).expect("valid");
        assert_eq!(config.patient_id, "john-roe");
        assert_eq!(config.medications_path, "medications");
        assert!(config.fdc_api_key.is_none());
    }

    #[test]
    fn from_json_clamps_tunables() {
        let config = DashboardConfig::from_json(
            r#"{"scan_ceiling_ms": 10, "jpeg_quality": 0, "late_result_policy": "discard"}"#,
        )
        .expect("valid");
        assert_eq!(config.scan_ceiling_ms, MIN_SCAN_CEILING_MS);
        assert_eq!(config.jpeg_quality, 1);
        assert_eq!(config.late_result_policy, LateResultPolicy::Discard);
    }

    #[test]
    fn blank_keys_are_dropped() {
        let config =
            DashboardConfig::from_json(r#"{"fdc_api_key": "  ", "infermedica_app_id": "id", "infermedica_app_key": "key"}"#)
                .expect("valid");
        assert!(config.fdc_api_key.is_none());
        let (id, key) = config.infermedica_credentials().expect("credentials");
        assert_eq!(id.expose(), "id");
        assert_eq!(key.expose(), "key");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            DashboardConfig::from_json("not json"),
            Err(ConfigError::InvalidJson(_))
        ));
        assert_eq!(
            DashboardConfig::from_json(r#"{"patient_id": "a/b"}"#),
            Err(ConfigError::InvalidSegment {
                field: "patient_id",
                value: "a/b".into()
            })
        );
        assert!(matches!(
            DashboardConfig::from_json(r#"{"fda_base_url": "ftp://fda"}"#),
            Err(ConfigError::InvalidUrl { field: "fda_base_url", .. })
        ));
    }

    #[test]
    fn debug_redacts_keys() {
        let config = DashboardConfig {
            fdc_api_key: Some(ApiKey::new("very-secret")),
            ..DashboardConfig::default()
        };
        assert!(!format!("{config:?}").contains("very-secret"));
    }
}
