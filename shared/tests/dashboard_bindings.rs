use crux_core::testing::AppTester;
use serde_json::json;
use shared::binder::{BoundData, QueryIdentity, Record, SubscriptionId};
use shared::capabilities::{StoreError, StoreOperation};
use shared::event::PatientId;
use shared::{App, Effect, Event, Model, ViewModel};

fn store_ops(effects: &[Effect]) -> Vec<StoreOperation> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Store(request) => Some(request.operation.clone()),
            _ => None,
        })
        .collect()
}

fn subscriptions(ops: &[StoreOperation]) -> Vec<(SubscriptionId, QueryIdentity)> {
    ops.iter()
        .filter_map(|op| match op {
            StoreOperation::Subscribe { id, query } => Some((*id, query.clone())),
            StoreOperation::Unsubscribe { .. } => None,
        })
        .collect()
}

fn subscription_for(ops: &[StoreOperation], path: &str) -> SubscriptionId {
    subscriptions(ops)
        .into_iter()
        .find(|(_, query)| query.path() == path)
        .map(|(id, _)| id)
        .expect("subscription for path")
}

fn connected() -> (AppTester<App, Effect>, Model, Vec<StoreOperation>) {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    let update = app.update(Event::StoreConnected, &mut model);
    let ops = store_ops(&update.effects);
    (app, model, ops)
}

#[test]
fn connecting_subscribes_all_three_queries() {
    let (_app, model, ops) = connected();

    let mut paths: Vec<String> = subscriptions(&ops)
        .iter()
        .map(|(_, query)| query.path().to_string())
        .collect();
    paths.sort();
    assert_eq!(
        paths,
        vec!["healthMetrics", "medications", "patientProfiles/jane-doe"]
    );

    let view = ViewModel::build(&model);
    assert!(view.store_connected);
    assert!(view.profile.loading);
    assert!(view.medications.loading);
    assert!(view.health_metrics.data.is_empty());
}

#[test]
fn snapshots_populate_the_view() {
    let (app, mut model, ops) = connected();
    let profile = subscription_for(&ops, "patientProfiles/jane-doe");
    let medications = subscription_for(&ops, "medications");

    app.update(
        Event::StoreSnapshot {
            id: profile,
            result: Box::new(Ok(BoundData::Document(Some(Record::from_value(
                "jane-doe",
                json!({ "name": "Jane Doe", "age": 34, "bloodType": "O+" }),
            ))))),
        },
        &mut model,
    );
    let update = app.update(
        Event::StoreSnapshot {
            id: medications,
            result: Box::new(Ok(BoundData::Records(vec![Record::from_value(
                "m1",
                json!({ "name": "Lisinopril", "dosage": "10mg", "time": "08:00", "icon": "pill" }),
            )]))),
        },
        &mut model,
    );
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Render(_))));

    let view = ViewModel::build(&model);
    let profile = view.profile.data.expect("profile");
    assert_eq!(profile.name, "Jane Doe");
    assert_eq!(profile.blood_type, "O+");
    assert!(!view.profile.loading);
    assert_eq!(view.medications.data.len(), 1);
    assert_eq!(view.medications.data[0].medication.name, "Lisinopril");
}

#[test]
fn switching_patient_rebinds_only_the_profile() {
    let (app, mut model, ops) = connected();
    let old_profile = subscription_for(&ops, "patientProfiles/jane-doe");

    let update = app.update(
        Event::PatientSelected {
            patient_id: PatientId::new("john-roe"),
        },
        &mut model,
    );
    let ops = store_ops(&update.effects);

    assert!(ops.contains(&StoreOperation::Unsubscribe { id: old_profile }));
    let subscribed = subscriptions(&ops);
    assert_eq!(subscribed.len(), 1);
    assert_eq!(subscribed[0].1.path(), "patientProfiles/john-roe");

    // A late snapshot for the released profile never reaches the view.
    app.update(
        Event::StoreSnapshot {
            id: old_profile,
            result: Box::new(Ok(BoundData::Document(Some(Record::from_value(
                "jane-doe",
                json!({ "name": "Jane Doe", "age": 34, "bloodType": "O+" }),
            ))))),
        },
        &mut model,
    );
    let view = ViewModel::build(&model);
    assert!(view.profile.data.is_none());
    assert!(view.profile.loading);
}

#[test]
fn invalid_patient_id_is_ignored() {
    let (app, mut model, _) = connected();

    let update = app.update(
        Event::PatientSelected {
            patient_id: PatientId::new("../admin"),
        },
        &mut model,
    );

    assert!(store_ops(&update.effects).is_empty());
    assert_eq!(model.config.patient_id, "jane-doe");
}

#[test]
fn store_errors_surface_and_stay_terminal() {
    let (app, mut model, ops) = connected();
    let metrics = subscription_for(&ops, "healthMetrics");

    app.update(
        Event::StoreSnapshot {
            id: metrics,
            result: Box::new(Err(StoreError::PermissionDenied {
                path: "healthMetrics".into(),
            })),
        },
        &mut model,
    );
    app.update(
        Event::StoreSnapshot {
            id: metrics,
            result: Box::new(Ok(BoundData::Records(Vec::new()))),
        },
        &mut model,
    );

    let view = ViewModel::build(&model);
    assert_eq!(
        view.health_metrics.error.as_deref(),
        Some("Unable to load your health records.")
    );
    assert!(!view.health_metrics.loading);
}

#[test]
fn unmount_releases_every_subscription() {
    let (app, mut model, ops) = connected();

    let update = app.update(Event::DashboardUnmounted, &mut model);
    let released: Vec<StoreOperation> = store_ops(&update.effects);

    for (id, _) in subscriptions(&ops) {
        assert!(released.contains(&StoreOperation::Unsubscribe { id }));
    }
    let view = ViewModel::build(&model);
    assert!(!view.profile.loading);
    assert!(view.profile.data.is_none());
}

#[test]
fn reconfiguring_paths_moves_subscriptions() {
    let (app, mut model, _) = connected();
    let config = shared::DashboardConfig {
        medications_path: "clinicA_medications".into(),
        ..shared::DashboardConfig::default()
    };

    let update = app.update(Event::Configure(Box::new(config)), &mut model);
    let subscribed = subscriptions(&store_ops(&update.effects));

    assert_eq!(subscribed.len(), 1);
    assert_eq!(subscribed[0].1.path(), "clinicA_medications");
}
