use serde::{Deserialize, Serialize};

use crate::appointments::{Appointment, AppointmentBook, AppointmentStatus, Reminder};
use crate::binder::{Binder, BinderSlot, SubscriptionResult};
use crate::capabilities::StreamHandle;
use crate::capture::{CameraSession, CaptureWorkflow, ClassificationResult};
use crate::catalog::{DrugInteraction, MedicalCondition, MedicationInfo, RiskAssessment};
use crate::config::DashboardConfig;
use crate::food_log::{FoodEntry, FoodLog, CALORIE_LIMIT};
use crate::lookup::{DiagnosisResult, DrugInfo, LookupFailure, LookupReply, NutritionReport};
use crate::mediator::FormMediator;
use crate::vitals::{VitalHistoryEntry, VitalKind, VitalStatus, VitalsPanel};
use crate::{AppError, UnixTimeMs};

// --- Stored documents ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub blood_type: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Medication {
    pub id: String,
    pub name: String,
    pub dosage: String,
    pub time: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MetricPoint {
    pub time: String,
    pub value: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HealthMetric {
    pub id: String,
    pub name: String,
    pub value: String,
    pub unit: String,
    #[serde(default)]
    pub data: Vec<MetricPoint>,
}

// --- Glyphs: closed tag sets mapped by match ---

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Glyph {
    Pill,
    Heart,
    Activity,
    Droplet,
    Wind,
    Bone,
    Zap,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MedicationIcon {
    #[default]
    Pill,
}

impl MedicationIcon {
    /// Unknown or missing tags fall back to the pill glyph.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag.map(str::trim) {
            Some("pill") => MedicationIcon::Pill,
            _ => MedicationIcon::default(),
        }
    }

    pub fn glyph(self) -> Glyph {
        match self {
            MedicationIcon::Pill => Glyph::Pill,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    HeartRate,
    BloodPressure,
    OxygenLevel,
    Temperature,
    Other,
}

impl MetricKind {
    pub fn classify(metric: &HealthMetric) -> Self {
        let key = format!("{} {}", metric.id, metric.name).to_lowercase();
        if key.contains("heart") {
            MetricKind::HeartRate
        } else if key.contains("pressure") {
            MetricKind::BloodPressure
        } else if key.contains("oxygen") || key.contains("spo2") {
            MetricKind::OxygenLevel
        } else if key.contains("temp") {
            MetricKind::Temperature
        } else {
            MetricKind::Other
        }
    }

    pub fn glyph(self) -> Glyph {
        match self {
            MetricKind::HeartRate => Glyph::Heart,
            MetricKind::BloodPressure | MetricKind::Other => Glyph::Activity,
            MetricKind::OxygenLevel => Glyph::Droplet,
            MetricKind::Temperature => Glyph::Wind,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnatomySystem {
    #[default]
    Skeletal,
    Circulatory,
    Muscular,
}

impl AnatomySystem {
    pub const ALL: [AnatomySystem; 3] = [
        AnatomySystem::Skeletal,
        AnatomySystem::Circulatory,
        AnatomySystem::Muscular,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AnatomySystem::Skeletal => "Skeletal System",
            AnatomySystem::Circulatory => "Circulatory System",
            AnatomySystem::Muscular => "Muscular System",
        }
    }

    pub fn glyph(self) -> Glyph {
        match self {
            AnatomySystem::Skeletal => Glyph::Bone,
            AnatomySystem::Circulatory => Glyph::Heart,
            AnatomySystem::Muscular => Glyph::Zap,
        }
    }

    pub fn image_id(self) -> &'static str {
        match self {
            AnatomySystem::Skeletal => "skeletal-system",
            AnatomySystem::Circulatory => "circulatory-system",
            AnatomySystem::Muscular => "muscular-system",
        }
    }
}

// --- Model ---

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CatalogPanel {
    pub interactions: Option<Vec<DrugInteraction>>,
    pub condition: Option<ConditionSearch>,
    pub medication: Option<MedicationSearch>,
    pub risk: Option<RiskAssessment>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ConditionSearch {
    pub query: String,
    pub found: Option<MedicalCondition>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MedicationSearch {
    pub query: String,
    pub found: Option<MedicationInfo>,
}

#[derive(Debug)]
pub struct Model {
    pub config: DashboardConfig,
    pub store_connected: bool,
    pub profile: Binder,
    pub medications: Binder,
    pub health_metrics: Binder,

    pub capture: CaptureWorkflow,
    pub anatomy: AnatomySystem,

    pub symptom_check: FormMediator<String, AppError>,
    pub report: FormMediator<String, AppError>,

    pub drug: FormMediator<DrugInfo, LookupFailure>,
    pub nutrition: FormMediator<NutritionReport, LookupFailure>,
    pub diagnosis: FormMediator<DiagnosisResult, LookupFailure>,
    pub food_log: FoodLog,

    pub vitals: VitalsPanel,
    pub catalog: CatalogPanel,

    pub appointments: AppointmentBook,
    pub reminders: Vec<Reminder>,
    pub last_tick: Option<UnixTimeMs>,

    pub active_error: Option<AppError>,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            config: DashboardConfig::default(),
            store_connected: false,
            profile: Binder::new(BinderSlot::PatientProfile),
            medications: Binder::new(BinderSlot::Medications),
            health_metrics: Binder::new(BinderSlot::HealthMetrics),
            capture: CaptureWorkflow::new(),
            anatomy: AnatomySystem::default(),
            symptom_check: FormMediator::new(),
            report: FormMediator::new(),
            drug: FormMediator::new(),
            nutrition: FormMediator::new(),
            diagnosis: FormMediator::new(),
            food_log: FoodLog::new(),
            vitals: VitalsPanel::new(),
            catalog: CatalogPanel::default(),
            appointments: AppointmentBook::new(),
            reminders: Vec::new(),
            last_tick: None,
            active_error: None,
        }
    }
}

impl Model {
    pub fn binder_mut(&mut self, slot: BinderSlot) -> &mut Binder {
        match slot {
            BinderSlot::PatientProfile => &mut self.profile,
            BinderSlot::Medications => &mut self.medications,
            BinderSlot::HealthMetrics => &mut self.health_metrics,
        }
    }
}

// --- ViewModel ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BoundView<T> {
    pub data: T,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> BoundView<T> {
    fn from_result(result: &SubscriptionResult, data: T) -> Self {
        Self {
            data,
            loading: result.loading,
            error: result.error.clone().map(|e| AppError::from(e).message),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MedicationView {
    pub medication: Medication,
    pub glyph: Glyph,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HealthMetricView {
    pub metric: HealthMetric,
    pub kind: MetricKind,
    pub glyph: Glyph,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraStatus {
    Closed,
    RequestingPermission,
    Streaming,
    Denied,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AnatomyView {
    pub system: AnatomySystem,
    pub name: String,
    pub glyph: Glyph,
    pub image_id: String,
}

impl From<AnatomySystem> for AnatomyView {
    fn from(system: AnatomySystem) -> Self {
        Self {
            system,
            name: system.name().to_string(),
            glyph: system.glyph(),
            image_id: system.image_id().to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CameraView {
    pub status: CameraStatus,
    pub stream: Option<StreamHandle>,
    pub scanning: bool,
    pub can_capture: bool,
    pub result: Option<ClassificationResult>,
    /// Overlay is shown only once a person has been detected.
    pub overlay: Option<AnatomyView>,
    pub systems: Vec<AnatomyView>,
    pub notice: Option<Notice>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FormView {
    pub pending: bool,
    pub result: Option<String>,
    pub error: Option<String>,
}

impl From<&FormMediator<String, AppError>> for FormView {
    fn from(form: &FormMediator<String, AppError>) -> Self {
        Self {
            pending: form.is_pending(),
            result: form.result().cloned(),
            error: form.error().map(AppError::user_facing_message),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LookupView {
    pub pending: bool,
    pub reply: Option<LookupReply>,
}

impl<T: Serialize> From<&FormMediator<T, LookupFailure>> for LookupView {
    fn from(form: &FormMediator<T, LookupFailure>) -> Self {
        let reply = match (form.result(), form.error()) {
            (Some(value), _) => Some(LookupReply::from_result::<&T>(&Ok(value))),
            (None, Some(failure)) => Some(LookupReply::failure(failure)),
            (None, None) => None,
        };
        Self {
            pending: form.is_pending(),
            reply,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FoodLogView {
    pub entries: Vec<FoodEntry>,
    pub total_calories: f64,
    pub calorie_limit: f64,
    pub progress_percent: f64,
    pub limit_exceeded: bool,
}

impl From<&FoodLog> for FoodLogView {
    fn from(log: &FoodLog) -> Self {
        Self {
            entries: log.entries().to_vec(),
            total_calories: log.total_calories(),
            calorie_limit: CALORIE_LIMIT,
            progress_percent: log.progress_percent(),
            limit_exceeded: log.limit_exceeded(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct VitalCard {
    pub kind: VitalKind,
    pub label: String,
    /// `None` until a reading of this kind has been entered.
    pub value: Option<String>,
    pub status: VitalStatus,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VitalsView {
    pub cards: Vec<VitalCard>,
    pub history: Vec<VitalHistoryEntry>,
}

impl From<&VitalsPanel> for VitalsView {
    fn from(panel: &VitalsPanel) -> Self {
        let cards = VitalKind::ALL
            .into_iter()
            .map(|kind| {
                let current = panel.current(kind);
                VitalCard {
                    kind,
                    label: kind.label().to_string(),
                    value: current.map(|v| v.display()),
                    status: current.map(|v| v.status()).unwrap_or_default(),
                }
            })
            .collect();
        Self {
            cards,
            history: panel.history().to_vec(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AppointmentView {
    pub appointment: Appointment,
    pub status: Option<AppointmentStatus>,
    pub status_label: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ViewModel {
    pub store_connected: bool,
    pub profile: BoundView<Option<PatientProfile>>,
    pub medications: BoundView<Vec<MedicationView>>,
    pub health_metrics: BoundView<Vec<HealthMetricView>>,
    pub camera: CameraView,
    pub symptom_check: FormView,
    pub report: FormView,
    pub drug: LookupView,
    pub nutrition: LookupView,
    pub diagnosis: LookupView,
    pub food_log: FoodLogView,
    pub vitals: VitalsView,
    pub catalog: CatalogPanel,
    pub appointments: Vec<AppointmentView>,
    pub reminders: Vec<Reminder>,
    pub error: Option<Notice>,
}

impl ViewModel {
    pub fn build(model: &Model) -> Self {
        let profile = model.profile.result();
        let medications = model.medications.result();
        let metrics = model.health_metrics.result();

        Self {
            store_connected: model.store_connected,
            profile: BoundView::from_result(profile, profile.decode_document()),
            medications: BoundView::from_result(
                medications,
                medications
                    .decode_records::<Medication>()
                    .into_iter()
                    .map(|medication| {
                        let glyph = MedicationIcon::from_tag(medication.icon.as_deref()).glyph();
                        MedicationView { medication, glyph }
                    })
                    .collect(),
            ),
            health_metrics: BoundView::from_result(
                metrics,
                metrics
                    .decode_records::<HealthMetric>()
                    .into_iter()
                    .map(|metric| {
                        let kind = MetricKind::classify(&metric);
                        HealthMetricView {
                            metric,
                            kind,
                            glyph: kind.glyph(),
                        }
                    })
                    .collect(),
            ),
            camera: camera_view(model),
            symptom_check: FormView::from(&model.symptom_check),
            report: FormView::from(&model.report),
            drug: LookupView::from(&model.drug),
            nutrition: LookupView::from(&model.nutrition),
            diagnosis: LookupView::from(&model.diagnosis),
            food_log: FoodLogView::from(&model.food_log),
            vitals: VitalsView::from(&model.vitals),
            catalog: model.catalog.clone(),
            appointments: model
                .appointments
                .appointments()
                .iter()
                .map(|appointment| {
                    let status = model
                        .last_tick
                        .map(|now| AppointmentStatus::at(appointment.scheduled_at, now));
                    AppointmentView {
                        appointment: appointment.clone(),
                        status,
                        status_label: status.map(|s| s.label().to_string()),
                    }
                })
                .collect(),
            reminders: model.reminders.clone(),
            error: model.active_error.as_ref().map(|err| Notice {
                title: "Error".to_string(),
                description: err.user_facing_message(),
            }),
        }
    }
}

fn camera_view(model: &Model) -> CameraView {
    let capture = &model.capture;
    let status = match capture.session() {
        CameraSession::Closed => CameraStatus::Closed,
        CameraSession::RequestingPermission { .. } => CameraStatus::RequestingPermission,
        CameraSession::Granted { .. } => CameraStatus::Streaming,
        CameraSession::Denied { .. } => CameraStatus::Denied,
    };

    let result = capture.result().cloned();
    let notice = if status == CameraStatus::Denied {
        Some(Notice {
            title: "Camera Access Denied".to_string(),
            description:
                "Please enable camera permissions in your browser settings to use this feature."
                    .to_string(),
        })
    } else if let Some(err) = capture.error() {
        Some(Notice {
            title: "Error".to_string(),
            description: err.user_facing_message(),
        })
    } else if result.as_ref().is_some_and(|r| !r.detected) {
        Some(Notice {
            title: "No Person Detected".to_string(),
            description: "The AI could not find a person in the view. Please try again."
                .to_string(),
        })
    } else {
        None
    };

    let detected = status == CameraStatus::Streaming && result.as_ref().is_some_and(|r| r.detected);

    CameraView {
        status,
        stream: capture.session().stream().cloned(),
        scanning: capture.scan().is_scanning(),
        can_capture: capture.can_capture(),
        result,
        overlay: detected.then(|| AnatomyView::from(model.anatomy)),
        systems: AnatomySystem::ALL.into_iter().map(AnatomyView::from).collect(),
        notice,
    }
}
