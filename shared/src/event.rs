use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::appointments::NewAppointment;
use crate::binder::SubscriptionId;
use crate::capabilities::{
    CameraError, FlowResult, HttpResult, RawFrame, StoreResult, StreamHandle, TimerOutput,
};
use crate::capture::{AttemptId, SessionId};
use crate::catalog::RiskFactors;
use crate::config::DashboardConfig;
use crate::food_log::FoodEntryId;
use crate::lookup::{DiagnosisForm, DiagnosisPatient, SearchHit};
use crate::mediator::Ticket;
use crate::model::AnatomySystem;
use crate::vitals::VitalReading;
use crate::UnixTimeMs;

// --- API key: a long-lived credential held in config ---

/// Debug output is redacted and the buffer is zeroized on drop. The shell
/// hands keys in through `Configure`, so the wire form is the plain string.
#[derive(Deserialize)]
#[serde(transparent)]
pub struct ApiKey(SecretString);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::new(key.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn is_blank(&self) -> bool {
        self.expose().trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Clone for ApiKey {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl PartialEq for ApiKey {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for ApiKey {}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.expose())
    }
}

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(AppointmentId);
typed_id!(PatientId);

// --- Event enum: capability replies boxed to keep the enum small ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    // Setup & store
    Configure(Box<DashboardConfig>),
    StoreConnected,
    StoreDisconnected,
    PatientSelected {
        patient_id: PatientId,
    },
    StoreSnapshot {
        id: SubscriptionId,
        result: Box<StoreResult>,
    },
    DashboardUnmounted,

    // Camera capture
    CameraDialogOpened,
    CameraDialogClosed,
    CameraAcquired {
        session: SessionId,
        result: Box<Result<StreamHandle, CameraError>>,
    },
    CaptureRequested,
    FrameCaptured {
        attempt: AttemptId,
        result: Box<Result<RawFrame, CameraError>>,
    },
    ClassificationReceived {
        attempt: AttemptId,
        result: Box<FlowResult>,
    },
    ScanCeilingElapsed {
        attempt: AttemptId,
        output: TimerOutput,
    },
    AnatomySystemSelected {
        system: AnatomySystem,
    },

    // Symptom summarization dialog
    SymptomCheckSubmitted {
        symptoms: String,
    },
    SymptomCheckSettled {
        ticket: Ticket,
        result: Box<FlowResult>,
    },
    SymptomDialogClosed,

    // Medical report card
    ReportSubmitted {
        media_data_uri: String,
    },
    ReportSettled {
        ticket: Ticket,
        result: Box<FlowResult>,
    },
    ReportCleared,

    // Third-party lookups
    DrugLookupRequested {
        name: String,
    },
    DrugLookupResponse {
        ticket: Ticket,
        result: Box<HttpResult>,
    },
    NutritionLookupRequested {
        query: String,
    },
    NutritionSearchResponse {
        ticket: Ticket,
        result: Box<HttpResult>,
    },
    NutritionDetailResponse {
        ticket: Ticket,
        hit: SearchHit,
        result: Box<HttpResult>,
    },
    DiagnosisRequested(Box<DiagnosisForm>),
    DiagnosisParseResponse {
        ticket: Ticket,
        patient: DiagnosisPatient,
        result: Box<HttpResult>,
    },
    DiagnosisResponse {
        ticket: Ticket,
        result: Box<HttpResult>,
    },

    // Food log
    FoodRemoved {
        id: FoodEntryId,
    },
    FoodLogCleared,

    // Vitals card
    VitalRecorded {
        reading: VitalReading,
        now: UnixTimeMs,
    },

    // Clinical reference
    InteractionsRequested {
        medications: Vec<String>,
    },
    ConditionSearched {
        name: String,
    },
    MedicationInfoRequested {
        name: String,
    },
    RiskAssessmentRequested(Box<RiskFactors>),

    // Appointments
    AppointmentAdded {
        draft: Box<NewAppointment>,
        now: UnixTimeMs,
    },
    AppointmentRemoved {
        id: AppointmentId,
    },
    ReminderTick {
        now: UnixTimeMs,
    },
    RemindersAcknowledged,

    DismissError,
}

impl Event {
    /// Variant name for logs. Payloads may hold patient data and stay out.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Configure(_) => "configure",
            Event::StoreConnected => "store_connected",
            Event::StoreDisconnected => "store_disconnected",
            Event::PatientSelected { .. } => "patient_selected",
            Event::StoreSnapshot { .. } => "store_snapshot",
            Event::DashboardUnmounted => "dashboard_unmounted",
            Event::CameraDialogOpened => "camera_dialog_opened",
            Event::CameraDialogClosed => "camera_dialog_closed",
            Event::CameraAcquired { .. } => "camera_acquired",
            Event::CaptureRequested => "capture_requested",
            Event::FrameCaptured { .. } => "frame_captured",
            Event::ClassificationReceived { .. } => "classification_received",
            Event::ScanCeilingElapsed { .. } => "scan_ceiling_elapsed",
            Event::AnatomySystemSelected { .. } => "anatomy_system_selected",
            Event::SymptomCheckSubmitted { .. } => "symptom_check_submitted",
            Event::SymptomCheckSettled { .. } => "symptom_check_settled",
            Event::SymptomDialogClosed => "symptom_dialog_closed",
            Event::ReportSubmitted { .. } => "report_submitted",
            Event::ReportSettled { .. } => "report_settled",
            Event::ReportCleared => "report_cleared",
            Event::DrugLookupRequested { .. } => "drug_lookup_requested",
            Event::DrugLookupResponse { .. } => "drug_lookup_response",
            Event::NutritionLookupRequested { .. } => "nutrition_lookup_requested",
            Event::NutritionSearchResponse { .. } => "nutrition_search_response",
            Event::NutritionDetailResponse { .. } => "nutrition_detail_response",
            Event::DiagnosisRequested(_) => "diagnosis_requested",
            Event::DiagnosisParseResponse { .. } => "diagnosis_parse_response",
            Event::DiagnosisResponse { .. } => "diagnosis_response",
            Event::FoodRemoved { .. } => "food_removed",
            Event::FoodLogCleared => "food_log_cleared",
            Event::VitalRecorded { .. } => "vital_recorded",
            Event::InteractionsRequested { .. } => "interactions_requested",
            Event::ConditionSearched { .. } => "condition_searched",
            Event::MedicationInfoRequested { .. } => "medication_info_requested",
            Event::RiskAssessmentRequested(_) => "risk_assessment_requested",
            Event::AppointmentAdded { .. } => "appointment_added",
            Event::AppointmentRemoved { .. } => "appointment_removed",
            Event::ReminderTick { .. } => "reminder_tick",
            Event::RemindersAcknowledged => "reminders_acknowledged",
            Event::DismissError => "dismiss_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_debug_is_redacted() {
        let key = ApiKey::new("super_secret");
        assert_eq!(format!("{key:?}"), "[REDACTED]");
        assert_eq!(key.expose(), "super_secret");
    }

    #[test]
    fn api_key_serializes_as_plain_string() {
        let key: ApiKey = serde_json::from_str("\"abc\"").expect("key");
        assert_eq!(key.expose(), "abc");
        assert_eq!(serde_json::to_string(&key).expect("json"), "\"abc\"");
        assert!(ApiKey::new(" \t").is_blank());
    }

    #[test]
    fn api_key_clone_compares_by_value() {
        let key = ApiKey::new("fdc-key");
        let copy = key.clone();
        assert_eq!(key, copy);
        assert_ne!(key, ApiKey::new("other"));
        assert_eq!(format!("{copy:?}"), "[REDACTED]");
    }

    #[test]
    fn configure_event_debug_hides_keys() {
        let config = DashboardConfig {
            fdc_api_key: Some(ApiKey::new("fdc-secret")),
            infermedica_app_key: Some(ApiKey::new("infer-secret")),
            ..DashboardConfig::default()
        };
        let event = Event::Configure(Box::new(config));
        let debug = format!("{event:?}");
        assert!(!debug.contains("fdc-secret"));
        assert!(!debug.contains("infer-secret"));

        let json = serde_json::to_string(&event).expect("json");
        let back: Event = serde_json::from_str(&json).expect("event");
        assert_eq!(back, event);
    }

    #[test]
    fn typed_ids_display_their_value() {
        let id = AppointmentId::new("apt-1");
        assert_eq!(id.to_string(), "apt-1");
        assert_eq!(PatientId::new("jane-doe").as_str(), "jane-doe");
    }

    #[test]
    fn event_names_hide_payloads() {
        let event = Event::ReportSubmitted {
            media_data_uri: "data:image/jpeg;base64,SECRET".into(),
        };
        assert_eq!(event.name(), "report_submitted");
    }

    #[test]
    fn event_size_is_reasonable() {
        // Ensure boxing keeps the enum small.
        let size = std::mem::size_of::<Event>();
        assert!(
            size <= 128,
            "Event enum is {size} bytes, box more variants"
        );
    }
}
