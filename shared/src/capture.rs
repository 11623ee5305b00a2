use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::capabilities::{CameraError, RawFrame, StreamHandle, TimerId};
use crate::config::LateResultPolicy;
use crate::frame;
use crate::{AppError, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttemptId(pub u64);

impl AttemptId {
    pub fn ceiling_timer(self) -> TimerId {
        TimerId::new(format!("scan-ceiling-{}", self.0))
    }
}

/// Camera lifecycle bound to the capture dialog. A stream exists only in `Granted`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraSession {
    #[default]
    Closed,
    RequestingPermission {
        session: SessionId,
    },
    Granted {
        session: SessionId,
        stream: StreamHandle,
    },
    Denied {
        session: SessionId,
        reason: String,
    },
}

impl CameraSession {
    pub fn stream(&self) -> Option<&StreamHandle> {
        match self {
            CameraSession::Granted { stream, .. } => Some(stream),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, CameraSession::Closed)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanState {
    #[default]
    Idle,
    Scanning {
        attempt: AttemptId,
    },
    Settled {
        attempt: AttemptId,
        timed_out: bool,
    },
}

impl ScanState {
    pub fn is_scanning(&self) -> bool {
        matches!(self, ScanState::Scanning { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub detected: bool,
    pub confidence: Option<f32>,
    pub message: String,
}

/// Side effects the workflow needs the app to perform, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureCommand {
    Acquire { session: SessionId },
    Release { stream: StreamHandle },
    CaptureFrame { attempt: AttemptId, stream: StreamHandle },
    StartCeiling { attempt: AttemptId, after_ms: u64 },
    CancelCeiling { attempt: AttemptId },
    Classify { attempt: AttemptId, media_data_uri: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("camera is not streaming")]
    NotStreaming,

    #[error("a scan is already in progress")]
    AlreadyScanning,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureWorkflow {
    session: CameraSession,
    scan: ScanState,
    result: Option<ClassificationResult>,
    error: Option<AppError>,
    next_session: u64,
    next_attempt: u64,
    // Attempts numbered below this belong to a dialog that has since closed.
    attempt_floor: u64,
}

impl CaptureWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &CameraSession {
        &self.session
    }

    pub fn scan(&self) -> ScanState {
        self.scan
    }

    pub fn result(&self) -> Option<&ClassificationResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&AppError> {
        self.error.as_ref()
    }

    pub fn can_capture(&self) -> bool {
        self.session.stream().is_some() && !self.scan.is_scanning()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn open(&mut self) -> Vec<CaptureCommand> {
        if self.session.is_open() {
            debug!(session = ?self.session, "camera dialog already open");
            return Vec::new();
        }

        self.next_session += 1;
        let session = SessionId(self.next_session);
        self.session = CameraSession::RequestingPermission { session };
        self.scan = ScanState::Idle;
        self.result = None;
        self.error = None;
        info!(session = session.0, "requesting camera");
        vec![CaptureCommand::Acquire { session }]
    }

    pub fn on_acquired(
        &mut self,
        session: SessionId,
        outcome: Result<StreamHandle, CameraError>,
    ) -> Vec<CaptureCommand> {
        let current = matches!(
            self.session,
            CameraSession::RequestingPermission { session: s } if s == session
        );

        match (current, outcome) {
            (true, Ok(stream)) => {
                info!(session = session.0, tracks = stream.tracks.len(), "camera granted");
                self.session = CameraSession::Granted { session, stream };
                Vec::new()
            }
            (true, Err(err)) => {
                warn!(session = session.0, error = %err, "camera denied");
                self.session = CameraSession::Denied {
                    session,
                    reason: err.to_string(),
                };
                self.error = Some(err.into());
                Vec::new()
            }
            (false, Ok(stream)) => {
                warn!(session = session.0, "stream acquired after dialog moved on, releasing");
                vec![CaptureCommand::Release { stream }]
            }
            (false, Err(err)) => {
                debug!(session = session.0, error = %err, "ignoring stale acquisition failure");
                Vec::new()
            }
        }
    }

    pub fn close(&mut self) -> Vec<CaptureCommand> {
        let mut commands = Vec::new();
        if let ScanState::Scanning { attempt } = self.scan {
            commands.push(CaptureCommand::CancelCeiling { attempt });
        }
        if let CameraSession::Granted { stream, .. } = std::mem::take(&mut self.session) {
            info!(stream = ?stream.id, "releasing camera stream");
            commands.push(CaptureCommand::Release { stream });
        }

        self.scan = ScanState::Idle;
        self.result = None;
        self.error = None;
        self.attempt_floor = self.next_attempt + 1;
        commands
    }

    pub fn begin_capture(&mut self, ceiling_ms: u64) -> Result<Vec<CaptureCommand>, CaptureError> {
        let stream = self
            .session
            .stream()
            .cloned()
            .ok_or(CaptureError::NotStreaming)?;
        if self.scan.is_scanning() {
            return Err(CaptureError::AlreadyScanning);
        }

        self.next_attempt += 1;
        let attempt = AttemptId(self.next_attempt);
        self.scan = ScanState::Scanning { attempt };
        self.error = None;
        info!(attempt = attempt.0, ceiling_ms, "scan started");

        Ok(vec![
            CaptureCommand::CaptureFrame { attempt, stream },
            CaptureCommand::StartCeiling {
                attempt,
                after_ms: ceiling_ms,
            },
        ])
    }

    /// Encodes the captured still and hands it to classification. The encoded
    /// payload is moved into the command and not retained here.
    pub fn on_frame(
        &mut self,
        attempt: AttemptId,
        outcome: Result<RawFrame, CameraError>,
        jpeg_quality: u8,
    ) -> Vec<CaptureCommand> {
        if self.scan != (ScanState::Scanning { attempt }) {
            debug!(attempt = attempt.0, "frame for an attempt no longer scanning");
            return Vec::new();
        }

        let encoded = outcome
            .map_err(AppError::from)
            .and_then(|raw| frame::encode_data_uri(&raw, jpeg_quality).map_err(AppError::from));

        match encoded {
            Ok(media_data_uri) => vec![CaptureCommand::Classify {
                attempt,
                media_data_uri,
            }],
            Err(err) => {
                warn!(attempt = attempt.0, error = %err, "frame capture failed");
                self.settle(attempt, false);
                self.error = Some(err);
                self.result = None;
                vec![CaptureCommand::CancelCeiling { attempt }]
            }
        }
    }

    pub fn on_classification(
        &mut self,
        attempt: AttemptId,
        outcome: Result<ClassificationResult, AppError>,
        policy: LateResultPolicy,
    ) -> Vec<CaptureCommand> {
        if attempt.0 < self.attempt_floor || !self.session.is_open() {
            debug!(attempt = attempt.0, "classification for a closed dialog discarded");
            return Vec::new();
        }

        match self.scan {
            ScanState::Scanning { attempt: a } if a == attempt => {
                self.settle(attempt, false);
                self.apply(outcome);
                vec![CaptureCommand::CancelCeiling { attempt }]
            }
            ScanState::Settled {
                attempt: a,
                timed_out: true,
            } if a == attempt => {
                match policy {
                    LateResultPolicy::Apply => {
                        info!(attempt = attempt.0, "applying late classification");
                        self.apply(outcome);
                    }
                    LateResultPolicy::Discard => {
                        info!(attempt = attempt.0, "discarding late classification");
                    }
                }
                Vec::new()
            }
            _ => {
                debug!(attempt = attempt.0, scan = ?self.scan, "superseded classification discarded");
                Vec::new()
            }
        }
    }

    /// Bounded wait: the attempt settles when the ceiling fires even if the
    /// classification never returns.
    pub fn on_ceiling(&mut self, attempt: AttemptId, policy: LateResultPolicy) {
        if self.scan != (ScanState::Scanning { attempt }) {
            return;
        }
        info!(attempt = attempt.0, "scan ceiling reached");
        self.settle(attempt, true);
        if policy == LateResultPolicy::Discard {
            self.result = None;
            self.error = Some(AppError::new(
                ErrorKind::Timeout,
                "The scan took too long. Please try again.",
            ));
        }
    }

    fn settle(&mut self, attempt: AttemptId, timed_out: bool) {
        self.scan = ScanState::Settled { attempt, timed_out };
    }

    fn apply(&mut self, outcome: Result<ClassificationResult, AppError>) {
        match outcome {
            Ok(result) => {
                self.result = Some(result);
                self.error = None;
            }
            Err(err) => {
                self.result = None;
                self.error = Some(err);
            }
        }
    }
}
