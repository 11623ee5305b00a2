use crux_core::testing::AppTester;
use shared::capabilities::{
    CameraError, CameraOperation, FlowOperation, FlowReply, FlowRequest, RawFrame, StreamHandle,
    TimerOperation, TimerOutput,
};
use shared::capture::{AttemptId, CameraSession, ScanState};
use shared::model::{AnatomySystem, CameraStatus};
use shared::{App, Effect, Event, Model, ViewModel};

fn camera_ops(effects: &[Effect]) -> Vec<CameraOperation> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Camera(request) => Some(request.operation.clone()),
            _ => None,
        })
        .collect()
}

fn timer_ops(effects: &[Effect]) -> Vec<TimerOperation> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Timer(request) => Some(request.operation.clone()),
            _ => None,
        })
        .collect()
}

fn flow_requests(effects: &[Effect]) -> Vec<FlowRequest> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Flow(request) => match &request.operation {
                FlowOperation::Invoke(flow) => Some(flow.clone()),
            },
            _ => None,
        })
        .collect()
}

fn stream() -> StreamHandle {
    StreamHandle::new("stream-1", ["video-track-1".to_string()])
}

fn frame() -> RawFrame {
    RawFrame {
        width: 2,
        height: 2,
        rgba: vec![128; 16],
    }
}

fn streaming() -> (AppTester<App, Effect>, Model) {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let update = app.update(Event::CameraDialogOpened, &mut model);
    assert!(camera_ops(&update.effects)
        .iter()
        .any(|op| matches!(op, CameraOperation::Acquire { .. })));

    let CameraSession::RequestingPermission { session } = model.capture.session().clone() else {
        panic!("expected a pending permission request");
    };
    app.update(
        Event::CameraAcquired {
            session,
            result: Box::new(Ok(stream())),
        },
        &mut model,
    );
    (app, model)
}

fn start_scan(app: &AppTester<App, Effect>, model: &mut Model) -> AttemptId {
    let update = app.update(Event::CaptureRequested, model);
    assert!(camera_ops(&update.effects)
        .iter()
        .any(|op| matches!(op, CameraOperation::CaptureFrame { .. })));
    assert!(timer_ops(&update.effects)
        .iter()
        .any(|op| matches!(op, TimerOperation::Start { after_ms: 3_000, .. })));

    let ScanState::Scanning { attempt } = model.capture.scan() else {
        panic!("expected a scan in progress");
    };
    attempt
}

#[test]
fn granted_camera_streams() {
    let (_app, model) = streaming();

    let view = ViewModel::build(&model);
    assert_eq!(view.camera.status, CameraStatus::Streaming);
    assert_eq!(view.camera.stream, Some(stream()));
    assert!(view.camera.can_capture);
    assert!(view.camera.overlay.is_none());
    assert_eq!(view.camera.systems.len(), 3);
}

#[test]
fn denied_camera_shows_notice() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    app.update(Event::CameraDialogOpened, &mut model);
    let CameraSession::RequestingPermission { session } = model.capture.session().clone() else {
        panic!("expected a pending permission request");
    };

    app.update(
        Event::CameraAcquired {
            session,
            result: Box::new(Err(CameraError::PermissionDenied {
                message: "NotAllowedError".into(),
            })),
        },
        &mut model,
    );

    let view = ViewModel::build(&model);
    assert_eq!(view.camera.status, CameraStatus::Denied);
    assert!(!view.camera.can_capture);
    assert_eq!(
        view.camera.notice.map(|n| n.title),
        Some("Camera Access Denied".to_string())
    );
}

#[test]
fn detected_person_shows_overlay() {
    let (app, mut model) = streaming();
    let attempt = start_scan(&app, &mut model);

    let update = app.update(
        Event::FrameCaptured {
            attempt,
            result: Box::new(Ok(frame())),
        },
        &mut model,
    );
    let requests = flow_requests(&update.effects);
    assert_eq!(requests.len(), 1);
    let FlowRequest::DetectHumanPresence { media_data_uri } = &requests[0] else {
        panic!("expected a presence check");
    };
    assert!(media_data_uri.starts_with("data:image/jpeg;base64,"));

    app.update(
        Event::AnatomySystemSelected {
            system: AnatomySystem::Circulatory,
        },
        &mut model,
    );
    let update = app.update(
        Event::ClassificationReceived {
            attempt,
            result: Box::new(Ok(FlowReply::new(
                r#"{"humanDetected": true, "confidence": 0.92, "message": "Person in frame"}"#,
            ))),
        },
        &mut model,
    );
    assert!(timer_ops(&update.effects)
        .iter()
        .any(|op| matches!(op, TimerOperation::Cancel { .. })));

    let view = ViewModel::build(&model);
    assert!(!view.camera.scanning);
    let result = view.camera.result.expect("classification");
    assert!(result.detected);
    assert_eq!(result.message, "Person in frame");
    assert_eq!(
        view.camera.overlay.map(|o| o.system),
        Some(AnatomySystem::Circulatory)
    );
    assert!(view.camera.notice.is_none());
}

#[test]
fn no_person_shows_notice() {
    let (app, mut model) = streaming();
    let attempt = start_scan(&app, &mut model);
    app.update(
        Event::FrameCaptured {
            attempt,
            result: Box::new(Ok(frame())),
        },
        &mut model,
    );

    app.update(
        Event::ClassificationReceived {
            attempt,
            result: Box::new(Ok(FlowReply::new("I only see an empty chair."))),
        },
        &mut model,
    );

    let view = ViewModel::build(&model);
    assert!(view.camera.overlay.is_none());
    assert_eq!(
        view.camera.notice.map(|n| n.title),
        Some("No Person Detected".to_string())
    );
}

#[test]
fn second_capture_while_scanning_is_ignored() {
    let (app, mut model) = streaming();
    start_scan(&app, &mut model);

    let update = app.update(Event::CaptureRequested, &mut model);
    assert!(camera_ops(&update.effects).is_empty());
    assert!(timer_ops(&update.effects).is_empty());
}

#[test]
fn ceiling_settles_scan_and_late_result_still_applies() {
    let (app, mut model) = streaming();
    let attempt = start_scan(&app, &mut model);

    app.update(
        Event::ScanCeilingElapsed {
            attempt,
            output: TimerOutput::Elapsed {
                id: attempt.ceiling_timer(),
            },
        },
        &mut model,
    );
    let view = ViewModel::build(&model);
    assert!(!view.camera.scanning);
    assert!(view.camera.can_capture);

    app.update(
        Event::ClassificationReceived {
            attempt,
            result: Box::new(Ok(FlowReply::new(r#"{"personDetected": true}"#))),
        },
        &mut model,
    );
    assert!(model.capture.result().is_some_and(|r| r.detected));
}

#[test]
fn closing_mid_scan_releases_and_discards() {
    let (app, mut model) = streaming();
    let attempt = start_scan(&app, &mut model);

    let update = app.update(Event::CameraDialogClosed, &mut model);
    assert!(camera_ops(&update.effects)
        .iter()
        .any(|op| matches!(op, CameraOperation::Release { stream: s } if *s == stream())));
    assert!(timer_ops(&update.effects)
        .iter()
        .any(|op| matches!(op, TimerOperation::Cancel { .. })));

    app.update(
        Event::ClassificationReceived {
            attempt,
            result: Box::new(Ok(FlowReply::new(r#"{"humanDetected": true}"#))),
        },
        &mut model,
    );

    let view = ViewModel::build(&model);
    assert_eq!(view.camera.status, CameraStatus::Closed);
    assert!(view.camera.result.is_none());
    assert!(view.camera.stream.is_none());
}

#[test]
fn late_grant_after_close_is_released() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    app.update(Event::CameraDialogOpened, &mut model);
    let CameraSession::RequestingPermission { session } = model.capture.session().clone() else {
        panic!("expected a pending permission request");
    };
    app.update(Event::CameraDialogClosed, &mut model);

    let update = app.update(
        Event::CameraAcquired {
            session,
            result: Box::new(Ok(stream())),
        },
        &mut model,
    );

    assert!(camera_ops(&update.effects)
        .iter()
        .any(|op| matches!(op, CameraOperation::Release { .. })));
    assert_eq!(*model.capture.session(), CameraSession::Closed);
}

#[test]
fn failed_frame_reports_error_and_dismisses() {
    let (app, mut model) = streaming();
    let attempt = start_scan(&app, &mut model);

    app.update(
        Event::FrameCaptured {
            attempt,
            result: Box::new(Err(CameraError::CaptureFailed {
                reason: "video not ready".into(),
            })),
        },
        &mut model,
    );
    let view = ViewModel::build(&model);
    assert_eq!(view.camera.notice.map(|n| n.title), Some("Error".to_string()));

    app.update(Event::DismissError, &mut model);
    assert!(ViewModel::build(&model).camera.notice.is_none());
}
