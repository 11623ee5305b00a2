use serde_json::Value;
use tracing::{debug, info, warn};

use crate::binder::{BindPlan, BinderSlot, QueryIdentity};
use crate::capabilities::{Capabilities, FlowRequest, FlowResult, HttpResult, MediaConstraints};
use crate::capture::{CaptureCommand, CaptureError};
use crate::catalog::{ClinicalCatalog, StaticCatalog};
use crate::event::Event;
use crate::flows::{
    self, MEDIA_EMPTY_MESSAGE, MEDIA_MISSING_MESSAGE, SYMPTOMS_EMPTY_MESSAGE,
    SYMPTOMS_MISSING_MESSAGE,
};
use crate::lookup::{
    diagnosis, drug, nutrition, LookupFailure, LookupMethod, LookupRequest, NutritionReport,
};
use crate::mediator::SubmitError;
use crate::model::{ConditionSearch, MedicationSearch, Model, ViewModel};
use crate::{frame, AppError, ErrorKind};

pub struct App {
    catalog: Box<dyn ClinicalCatalog>,
}

impl Default for App {
    fn default() -> Self {
        Self::with_catalog(StaticCatalog)
    }
}

impl App {
    pub fn with_catalog(catalog: impl ClinicalCatalog + 'static) -> Self {
        Self {
            catalog: Box::new(catalog),
        }
    }

    fn desired_query(model: &Model, slot: BinderSlot) -> Option<QueryIdentity> {
        if !model.store_connected {
            return None;
        }
        let config = &model.config;
        Some(match slot {
            BinderSlot::PatientProfile => config.profile_query(),
            BinderSlot::Medications => config.medications_query(),
            BinderSlot::HealthMetrics => config.health_metrics_query(),
        })
    }

    /// Points every binder at the query the current config and connection
    /// call for. Unchanged queries are left subscribed.
    fn sync_bindings(model: &mut Model, caps: &Capabilities) {
        for slot in BinderSlot::ALL {
            let query = Self::desired_query(model, slot);
            let plan = model.binder_mut(slot).bind(query);
            Self::execute_bind_plan(plan, caps);
        }
    }

    fn execute_bind_plan(plan: BindPlan, caps: &Capabilities) {
        if let Some(old) = plan.release {
            caps.store.unsubscribe(old);
        }
        if let Some((id, query)) = plan.subscribe {
            debug!(slot = id.slot.as_str(), path = query.path(), "subscribing");
            caps.store.subscribe(id, query, move |result| Event::StoreSnapshot {
                id,
                result: Box::new(result),
            });
        }
    }

    fn run_capture(commands: Vec<CaptureCommand>, caps: &Capabilities) {
        for command in commands {
            match command {
                CaptureCommand::Acquire { session } => {
                    caps.camera
                        .acquire(MediaConstraints::default(), move |result| {
                            Event::CameraAcquired {
                                session,
                                result: Box::new(result),
                            }
                        });
                }
                CaptureCommand::Release { stream } => caps.camera.release(stream),
                CaptureCommand::CaptureFrame { attempt, stream } => {
                    caps.camera.capture_frame(stream, move |result| Event::FrameCaptured {
                        attempt,
                        result: Box::new(result),
                    });
                }
                CaptureCommand::StartCeiling { attempt, after_ms } => {
                    caps.timer
                        .start(attempt.ceiling_timer(), after_ms, move |output| {
                            Event::ScanCeilingElapsed { attempt, output }
                        });
                }
                CaptureCommand::CancelCeiling { attempt } => {
                    caps.timer.cancel(attempt.ceiling_timer());
                }
                CaptureCommand::Classify {
                    attempt,
                    media_data_uri,
                } => {
                    caps.flow.invoke(
                        FlowRequest::DetectHumanPresence { media_data_uri },
                        move |result| Event::ClassificationReceived {
                            attempt,
                            result: Box::new(result),
                        },
                    );
                }
            }
        }
    }

    fn close_capture(model: &mut Model, caps: &Capabilities) {
        let commands = model.capture.close();
        Self::run_capture(commands, caps);
    }

    /// A flow summary becomes display text, or the form-specific failure.
    fn summary_outcome(
        result: FlowResult,
        parse: fn(&str) -> Result<String, flows::FlowParseError>,
        empty_message: &str,
    ) -> Result<String, AppError> {
        let reply = result.map_err(AppError::from)?;
        parse(&reply.text).map_err(|err| err.into_app_error(empty_message))
    }

    fn input_missing(message: String) -> AppError {
        AppError::new(ErrorKind::InputMissing, message)
    }

    fn update_symptom_check(symptoms: &str, model: &mut Model, caps: &Capabilities) {
        match model
            .symptom_check
            .submit(&[("symptoms", symptoms)], SYMPTOMS_MISSING_MESSAGE)
        {
            Ok(ticket) => {
                caps.flow.invoke(
                    FlowRequest::SummarizeSymptoms {
                        text: symptoms.trim().to_string(),
                    },
                    move |result| Event::SymptomCheckSettled {
                        ticket,
                        result: Box::new(result),
                    },
                );
            }
            Err(SubmitError::InputMissing { message, .. }) => {
                model.symptom_check.reject(Self::input_missing(message));
            }
            Err(SubmitError::Busy) => debug!("symptom check already running"),
        }
    }

    fn update_report(media_data_uri: String, model: &mut Model, caps: &Capabilities) {
        let ticket = match model
            .report
            .submit(&[("media_data_uri", media_data_uri.as_str())], MEDIA_MISSING_MESSAGE)
        {
            Ok(ticket) => ticket,
            Err(SubmitError::InputMissing { message, .. }) => {
                model.report.reject(Self::input_missing(message));
                return;
            }
            Err(SubmitError::Busy) => {
                debug!("report summary already running");
                return;
            }
        };

        if let Err(err) = frame::parse_data_uri(&media_data_uri) {
            warn!(error = %err, "report upload is not a usable data URI");
            model.report.settle(ticket, Err(err.into()));
            return;
        }

        caps.flow.invoke(
            FlowRequest::SummarizeMedicalMedia { media_data_uri },
            move |result| Event::ReportSettled {
                ticket,
                result: Box::new(result),
            },
        );
    }

    /// Hands a built lookup to the shell; the reply comes back JSON-decoded.
    fn send_lookup<F>(request: LookupRequest, caps: &Capabilities, make_event: F)
    where
        F: FnOnce(HttpResult) -> Event + Send + 'static,
    {
        let LookupRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = match method {
            LookupMethod::Get => caps.http.get(url.as_str()),
            LookupMethod::Post => caps.http.post(url.as_str()),
        };
        if let Some(body) = body {
            builder = builder.body(body);
        }
        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        builder.expect_json::<Value>().send(make_event);
    }

    fn update_drug_lookup(name: &str, model: &mut Model, caps: &Capabilities) {
        let ticket = match model.drug.submit(&[("name", name)], drug::NAME_REQUIRED) {
            Ok(ticket) => ticket,
            Err(SubmitError::InputMissing { message, .. }) => {
                model.drug.reject(LookupFailure::new(400, message));
                return;
            }
            Err(SubmitError::Busy) => return,
        };

        match drug::request(&model.config.fda_base_url, name) {
            Ok(request) => Self::send_lookup(request, caps, move |result| {
                Event::DrugLookupResponse {
                    ticket,
                    result: Box::new(result),
                }
            }),
            Err(failure) => {
                model.drug.settle(ticket, Err(failure));
            }
        }
    }

    fn update_nutrition_lookup(query: &str, model: &mut Model, caps: &Capabilities) {
        let ticket = match model
            .nutrition
            .submit(&[("query", query)], nutrition::QUERY_REQUIRED)
        {
            Ok(ticket) => ticket,
            Err(SubmitError::InputMissing { message, .. }) => {
                model.nutrition.reject(LookupFailure::new(400, message));
                return;
            }
            Err(SubmitError::Busy) => return,
        };

        let config = &model.config;
        match nutrition::search_request(&config.fdc_base_url, config.fdc_api_key.as_ref(), query)
        {
            Ok(request) => Self::send_lookup(request, caps, move |result| {
                Event::NutritionSearchResponse {
                    ticket,
                    result: Box::new(result),
                }
            }),
            Err(failure) => {
                model.nutrition.settle(ticket, Err(failure));
            }
        }
    }

    fn update_diagnosis(
        form: &diagnosis::DiagnosisForm,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        let required = [
            ("symptoms", form.symptoms.as_str()),
            ("age", form.age.as_str()),
            ("gender", form.gender.as_str()),
        ];
        let ticket = match model.diagnosis.submit(&required, diagnosis::FIELDS_REQUIRED) {
            Ok(ticket) => ticket,
            Err(SubmitError::InputMissing { message, .. }) => {
                model.diagnosis.reject(LookupFailure::new(400, message));
                return;
            }
            Err(SubmitError::Busy) => return,
        };

        let config = &model.config;
        match diagnosis::parse_request(
            &config.infermedica_base_url,
            config.infermedica_credentials(),
            form,
        ) {
            Ok((request, patient)) => Self::send_lookup(request, caps, move |result| {
                Event::DiagnosisParseResponse {
                    ticket,
                    patient,
                    result: Box::new(result),
                }
            }),
            Err(failure) => {
                model.diagnosis.settle(ticket, Err(failure));
            }
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        let event_name = event.name();
        debug!(event = event_name, "update");

        match event {
            Event::Configure(config) => {
                let config = *config;
                match config.validate() {
                    Ok(()) => {
                        model.config = config.validated();
                        info!(patient = %model.config.patient_id, "dashboard configured");
                        Self::sync_bindings(model, caps);
                    }
                    Err(err) => {
                        warn!(error = %err, "rejected configuration");
                        model.active_error = Some(
                            AppError::new(ErrorKind::InputMissing, "Invalid configuration.")
                                .with_internal(err.to_string()),
                        );
                    }
                }
            }

            Event::StoreConnected => {
                model.store_connected = true;
                Self::sync_bindings(model, caps);
            }

            Event::StoreDisconnected => {
                model.store_connected = false;
                Self::sync_bindings(model, caps);
            }

            Event::PatientSelected { patient_id } => {
                let mut config = model.config.clone();
                config.patient_id = patient_id.as_str().to_string();
                if let Err(err) = config.validate() {
                    warn!(error = %err, "ignoring invalid patient id");
                    return;
                }
                model.config = config;
                Self::sync_bindings(model, caps);
            }

            Event::StoreSnapshot { id, result } => {
                let delivery = model.binder_mut(id.slot).apply(id, *result);
                debug!(slot = id.slot.as_str(), ?delivery, "store snapshot");
            }

            Event::DashboardUnmounted => {
                for slot in BinderSlot::ALL {
                    if let Some(id) = model.binder_mut(slot).unmount() {
                        caps.store.unsubscribe(id);
                    }
                }
                Self::close_capture(model, caps);
                model.symptom_check.close();
                model.report.close();
                model.drug.close();
                model.nutrition.close();
                model.diagnosis.close();
            }

            Event::CameraDialogOpened => {
                let commands = model.capture.open();
                Self::run_capture(commands, caps);
            }

            Event::CameraDialogClosed => Self::close_capture(model, caps),

            Event::CameraAcquired { session, result } => {
                let commands = model.capture.on_acquired(session, *result);
                Self::run_capture(commands, caps);
            }

            Event::CaptureRequested => {
                match model.capture.begin_capture(model.config.scan_ceiling_ms) {
                    Ok(commands) => Self::run_capture(commands, caps),
                    Err(CaptureError::AlreadyScanning) => debug!("capture already in progress"),
                    Err(CaptureError::NotStreaming) => {
                        debug!("capture requested without a live stream");
                    }
                }
            }

            Event::FrameCaptured { attempt, result } => {
                let commands = model
                    .capture
                    .on_frame(attempt, *result, model.config.jpeg_quality);
                Self::run_capture(commands, caps);
            }

            Event::ClassificationReceived { attempt, result } => {
                let outcome = (*result)
                    .map(|reply| flows::parse_detection(&reply.text))
                    .map_err(AppError::from);
                let commands = model.capture.on_classification(
                    attempt,
                    outcome,
                    model.config.late_result_policy,
                );
                Self::run_capture(commands, caps);
            }

            Event::ScanCeilingElapsed { attempt, output } => {
                if output.elapsed() {
                    model
                        .capture
                        .on_ceiling(attempt, model.config.late_result_policy);
                }
            }

            Event::AnatomySystemSelected { system } => {
                model.anatomy = system;
            }

            Event::SymptomCheckSubmitted { symptoms } => {
                Self::update_symptom_check(&symptoms, model, caps);
            }

            Event::SymptomCheckSettled { ticket, result } => {
                let outcome = Self::summary_outcome(
                    *result,
                    flows::parse_symptom_summary,
                    SYMPTOMS_EMPTY_MESSAGE,
                );
                model.symptom_check.settle(ticket, outcome);
            }

            Event::SymptomDialogClosed => model.symptom_check.close(),

            Event::ReportSubmitted { media_data_uri } => {
                Self::update_report(media_data_uri, model, caps);
            }

            Event::ReportSettled { ticket, result } => {
                let outcome =
                    Self::summary_outcome(*result, flows::parse_media_summary, MEDIA_EMPTY_MESSAGE);
                model.report.settle(ticket, outcome);
            }

            Event::ReportCleared => model.report.close(),

            Event::DrugLookupRequested { name } => {
                Self::update_drug_lookup(&name, model, caps);
            }

            Event::DrugLookupResponse { ticket, result } => {
                model.drug.settle(ticket, drug::translate(*result));
            }

            Event::NutritionLookupRequested { query } => {
                Self::update_nutrition_lookup(&query, model, caps);
            }

            Event::NutritionSearchResponse { ticket, result } => {
                if model.nutrition.pending_ticket() != Some(ticket) {
                    debug!("stale nutrition search reply");
                    return;
                }
                let config = &model.config;
                let next = nutrition::translate_search(*result).and_then(|hit| {
                    hit.map(|hit| {
                        nutrition::detail_request(
                            &config.fdc_base_url,
                            config.fdc_api_key.as_ref(),
                            &hit,
                        )
                        .map(|request| (hit, request))
                    })
                    .transpose()
                });
                match next {
                    Ok(Some((hit, request))) => {
                        Self::send_lookup(request, caps, move |result| {
                            Event::NutritionDetailResponse {
                                ticket,
                                hit,
                                result: Box::new(result),
                            }
                        });
                    }
                    Ok(None) => {
                        info!("no foods matched");
                        model.nutrition.settle(ticket, Ok(NutritionReport::default()));
                    }
                    Err(failure) => {
                        model.nutrition.settle(ticket, Err(failure));
                    }
                }
            }

            Event::NutritionDetailResponse {
                ticket,
                hit,
                result,
            } => {
                let outcome = nutrition::translate_detail(&hit, *result)
                    .map(|food| NutritionReport { foods: vec![food] });
                let logged = outcome.as_ref().ok().map(|report| report.foods.clone());
                if model.nutrition.settle(ticket, outcome) {
                    if let Some(foods) = logged {
                        model.food_log.append(foods);
                    }
                }
            }

            Event::DiagnosisRequested(form) => {
                Self::update_diagnosis(&form, model, caps);
            }

            Event::DiagnosisParseResponse {
                ticket,
                patient,
                result,
            } => {
                if model.diagnosis.pending_ticket() != Some(ticket) {
                    debug!("stale symptom parse reply");
                    return;
                }
                let config = &model.config;
                let request = diagnosis::translate_parse(*result).and_then(|evidence| {
                    diagnosis::diagnosis_request(
                        &config.infermedica_base_url,
                        config.infermedica_credentials(),
                        &patient,
                        &evidence,
                    )
                });
                match request {
                    Ok(request) => Self::send_lookup(request, caps, move |result| {
                        Event::DiagnosisResponse {
                            ticket,
                            result: Box::new(result),
                        }
                    }),
                    Err(failure) => {
                        model.diagnosis.settle(ticket, Err(failure));
                    }
                }
            }

            Event::DiagnosisResponse { ticket, result } => {
                model
                    .diagnosis
                    .settle(ticket, diagnosis::translate_diagnosis(*result));
            }

            Event::FoodRemoved { id } => {
                if model.food_log.remove(id).is_none() {
                    debug!(%id, "food already removed");
                }
            }

            Event::FoodLogCleared => model.food_log.clear(),

            Event::VitalRecorded { reading, now } => {
                if let Err(err) = model.vitals.record(reading, now) {
                    model.active_error = Some(
                        AppError::new(ErrorKind::InputMissing, "Please enter a valid reading.")
                            .with_internal(err.to_string()),
                    );
                }
            }

            Event::InteractionsRequested { medications } => {
                let medications: Vec<String> = medications
                    .into_iter()
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect();
                if medications.is_empty() {
                    return;
                }
                model.catalog.interactions = Some(self.catalog.drug_interactions(&medications));
            }

            Event::ConditionSearched { name } => {
                let query = name.trim();
                if query.is_empty() {
                    return;
                }
                model.catalog.condition = Some(ConditionSearch {
                    query: query.to_string(),
                    found: self.catalog.find_condition(query),
                });
            }

            Event::MedicationInfoRequested { name } => {
                let query = name.trim();
                if query.is_empty() {
                    return;
                }
                model.catalog.medication = Some(MedicationSearch {
                    query: query.to_string(),
                    found: self.catalog.medication_info(query),
                });
            }

            Event::RiskAssessmentRequested(factors) => {
                model.catalog.risk = Some(self.catalog.assess_risk(&factors));
            }

            Event::AppointmentAdded { draft, now } => {
                model.last_tick = Some(now);
                if let Err(err) = model.appointments.add(*draft, now) {
                    model.active_error = Some(err);
                }
            }

            Event::AppointmentRemoved { id } => {
                if !model.appointments.remove(&id) {
                    debug!(%id, "appointment already removed");
                }
                model.reminders.retain(|r| r.appointment != id);
            }

            Event::ReminderTick { now } => {
                model.last_tick = Some(now);
                let due = model.appointments.due_reminders(now);
                if !due.is_empty() {
                    info!(count = due.len(), "appointment reminders due");
                }
                model.reminders.extend(due);
            }

            Event::RemindersAcknowledged => model.reminders.clear(),

            Event::DismissError => {
                model.active_error = None;
                model.capture.dismiss_error();
                model.symptom_check.dismiss_error();
                model.report.dismiss_error();
            }
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::build(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::FlowReply;
    use crate::capture::AttemptId;
    use crate::catalog::RiskFactors;
    use crate::Effect;
    use crux_core::testing::AppTester;

    #[test]
    fn configure_rejects_bad_patient_id() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();
        let config = crate::DashboardConfig {
            patient_id: "a/b".into(),
            ..crate::DashboardConfig::default()
        };

        app.update(Event::Configure(Box::new(config)), &mut model);

        assert_eq!(model.config.patient_id, crate::DEFAULT_PATIENT_ID);
        assert_eq!(
            model.active_error.as_ref().map(|e| e.kind),
            Some(ErrorKind::InputMissing)
        );
    }

    #[test]
    fn blank_symptoms_fail_without_invoking_flow() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();

        let update = app.update(
            Event::SymptomCheckSubmitted {
                symptoms: "   ".into(),
            },
            &mut model,
        );

        assert!(!update
            .effects
            .iter()
            .any(|e| matches!(e, Effect::Flow(_))));
        assert_eq!(
            model.symptom_check.error().map(|e| e.message.as_str()),
            Some(SYMPTOMS_MISSING_MESSAGE)
        );
    }

    #[test]
    fn symptom_summary_settles_by_ticket() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();

        app.update(
            Event::SymptomCheckSubmitted {
                symptoms: "headache".into(),
            },
            &mut model,
        );
        let ticket = model.symptom_check.pending_ticket().expect("pending");

        app.update(
            Event::SymptomCheckSettled {
                ticket,
                result: Box::new(Ok(FlowReply::new(
                    r#"{"possibleConditions": "Tension headache"}"#,
                ))),
            },
            &mut model,
        );

        assert_eq!(
            model.symptom_check.result().map(String::as_str),
            Some("Tension headache")
        );
        assert!(!model.symptom_check.is_pending());
    }

    #[test]
    fn empty_symptom_summary_uses_form_message() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();

        app.update(
            Event::SymptomCheckSubmitted {
                symptoms: "cough".into(),
            },
            &mut model,
        );
        let ticket = model.symptom_check.pending_ticket().expect("pending");
        app.update(
            Event::SymptomCheckSettled {
                ticket,
                result: Box::new(Ok(FlowReply::new(r#"{"possibleConditions": ""}"#))),
            },
            &mut model,
        );

        assert_eq!(
            model.symptom_check.error().map(|e| e.message.as_str()),
            Some(SYMPTOMS_EMPTY_MESSAGE)
        );
    }

    #[test]
    fn closing_symptom_dialog_discards_late_reply() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();

        app.update(
            Event::SymptomCheckSubmitted {
                symptoms: "fever".into(),
            },
            &mut model,
        );
        let ticket = model.symptom_check.pending_ticket().expect("pending");
        app.update(Event::SymptomDialogClosed, &mut model);
        app.update(
            Event::SymptomCheckSettled {
                ticket,
                result: Box::new(Ok(FlowReply::new(r#"{"possibleConditions": "Flu"}"#))),
            },
            &mut model,
        );

        assert!(model.symptom_check.result().is_none());
        assert!(model.symptom_check.error().is_none());
    }

    #[test]
    fn report_rejects_non_data_uri() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();

        let update = app.update(
            Event::ReportSubmitted {
                media_data_uri: "https://example.com/xray.png".into(),
            },
            &mut model,
        );

        assert!(!update
            .effects
            .iter()
            .any(|e| matches!(e, Effect::Flow(_))));
        assert!(!model.report.is_pending());
        assert_eq!(
            model.report.error().map(|e| e.kind),
            Some(ErrorKind::InputMissing)
        );
    }

    #[test]
    fn blank_drug_name_is_400_without_http() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();

        let update = app.update(
            Event::DrugLookupRequested { name: " ".into() },
            &mut model,
        );

        assert!(!update
            .effects
            .iter()
            .any(|e| matches!(e, Effect::Http(_))));
        assert_eq!(
            model.drug.error(),
            Some(&LookupFailure::new(400, drug::NAME_REQUIRED))
        );
    }

    #[test]
    fn nutrition_without_key_is_503() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();

        app.update(
            Event::NutritionLookupRequested {
                query: "apple".into(),
            },
            &mut model,
        );

        assert_eq!(
            model.nutrition.error(),
            Some(&LookupFailure::new(503, nutrition::SERVICE_UNAVAILABLE))
        );
        assert!(!model.nutrition.is_pending());
    }

    #[test]
    fn catalog_queries_fill_the_panel() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();

        app.update(
            Event::ConditionSearched {
                name: "  ".into(),
            },
            &mut model,
        );
        assert!(model.catalog.condition.is_none());

        app.update(
            Event::RiskAssessmentRequested(Box::new(RiskFactors {
                age: 52,
                systolic: 150,
                diastolic: 95,
                cholesterol: 250,
                bmi: 31.0,
                smoker: true,
                diabetic: false,
            })),
            &mut model,
        );
        assert!(model.catalog.risk.is_some());
    }

    #[test]
    fn cancelled_ceiling_is_ignored() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();
        let attempt = AttemptId(1);

        app.update(
            Event::ScanCeilingElapsed {
                attempt,
                output: crate::capabilities::TimerOutput::Cancelled {
                    id: attempt.ceiling_timer(),
                },
            },
            &mut model,
        );

        assert!(!model.capture.scan().is_scanning());
    }
}
