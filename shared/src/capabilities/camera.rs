use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AppError, ErrorKind, MAX_FRAME_DIMENSION};

pub const DEFAULT_IDEAL_WIDTH: u32 = 1280;
pub const DEFAULT_IDEAL_HEIGHT: u32 = 720;

pub struct Camera<E> {
    context: CapabilityContext<CameraOperation, E>,
}

impl<Ev> Capability<Ev> for Camera<Ev> {
    type Operation = CameraOperation;
    type MappedSelf<MappedEv> = Camera<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Camera::new(self.context.map_event(f))
    }
}

impl<E> Camera<E>
where
    E: Send + 'static,
{
    pub fn new(context: CapabilityContext<CameraOperation, E>) -> Self {
        Self { context }
    }

    pub fn acquire<F>(&self, constraints: MediaConstraints, make_event: F)
    where
        F: FnOnce(Result<StreamHandle, CameraError>) -> E + Send + 'static,
    {
        let constraints = constraints.validated();
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let output = ctx
                .request_from_shell(CameraOperation::Acquire { constraints })
                .await;
            let stream = output.and_then(|out| match out {
                CameraOutput::Acquired(stream) => Ok(stream),
                other => Err(CameraError::UnexpectedOutput {
                    expected: "Acquired".to_string(),
                    received: other.name().to_string(),
                }),
            });
            ctx.update_app(make_event(stream));
        });
    }

    pub fn capture_frame<F>(&self, stream: StreamHandle, make_event: F)
    where
        F: FnOnce(Result<RawFrame, CameraError>) -> E + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let output = ctx
                .request_from_shell(CameraOperation::CaptureFrame { stream })
                .await;
            let frame = output.and_then(|out| match out {
                CameraOutput::Frame(frame) => Ok(frame),
                other => Err(CameraError::UnexpectedOutput {
                    expected: "Frame".to_string(),
                    received: other.name().to_string(),
                }),
            });
            ctx.update_app(make_event(frame));
        });
    }

    /// Stops every track of the stream. Fire-and-forget: the core has already
    /// dropped its reference by the time this is issued.
    pub fn release(&self, stream: StreamHandle) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(CameraOperation::Release { stream }).await;
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraOperation {
    Acquire { constraints: MediaConstraints },
    CaptureFrame { stream: StreamHandle },
    Release { stream: StreamHandle },
}

impl Operation for CameraOperation {
    type Output = CameraResult;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConstraints {
    pub video: bool,
    pub audio: bool,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            video: true,
            audio: false,
            ideal_width: DEFAULT_IDEAL_WIDTH,
            ideal_height: DEFAULT_IDEAL_HEIGHT,
        }
    }
}

impl MediaConstraints {
    /// Video is always requested and the ideal size stays within what the
    /// frame encoder accepts.
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.video = true;
        self.ideal_width = self.ideal_width.clamp(1, MAX_FRAME_DIMENSION);
        self.ideal_height = self.ideal_height.clamp(1, MAX_FRAME_DIMENSION);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub String);

/// Shell-side media stream. Only ever held by a granted camera session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamHandle {
    pub id: StreamId,
    pub tracks: Vec<TrackId>,
}

impl StreamHandle {
    pub fn new(id: impl Into<String>, tracks: impl IntoIterator<Item = String>) -> Self {
        Self {
            id: StreamId(id.into()),
            tracks: tracks.into_iter().map(TrackId).collect(),
        }
    }
}

/// An uncompressed still taken from the live video surface, tightly packed RGBA8.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    #[serde(with = "serde_bytes")]
    pub rgba: Vec<u8>,
}

impl std::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraOutput {
    Acquired(StreamHandle),
    Frame(RawFrame),
    Released,
}

impl CameraOutput {
    pub fn name(&self) -> &'static str {
        match self {
            CameraOutput::Acquired(_) => "Acquired",
            CameraOutput::Frame(_) => "Frame",
            CameraOutput::Released => "Released",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraError {
    #[error("camera permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("no camera available: {message}")]
    Unavailable { message: String },

    #[error("camera is in use by another application")]
    InUse,

    #[error("frame capture failed: {reason}")]
    CaptureFailed { reason: String },

    #[error("unexpected camera output: expected {expected}, received {received}")]
    UnexpectedOutput {
        expected: String,
        received: String,
    },
}

impl CameraError {
    pub fn is_permission_error(&self) -> bool {
        matches!(self, CameraError::PermissionDenied { .. })
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CameraError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            CameraError::Unavailable { .. } | CameraError::InUse => {
                ErrorKind::UpstreamUnavailable
            }
            CameraError::CaptureFailed { .. } | CameraError::UnexpectedOutput { .. } => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        let message = match &err {
            CameraError::PermissionDenied { .. } => "Camera Access Denied",
            CameraError::Unavailable { .. } | CameraError::InUse => "Camera unavailable",
            CameraError::CaptureFailed { .. } | CameraError::UnexpectedOutput { .. } => {
                "Could not capture a frame from the camera"
            }
        };
        AppError::new(err.kind(), message).with_internal(err.to_string())
    }
}

pub type CameraResult = Result<CameraOutput, CameraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraints_default_requests_video_only() {
        let c = MediaConstraints::default();
        assert!(c.video);
        assert!(!c.audio);
    }

    #[test]
    fn test_constraints_validated_clamps() {
        let c = MediaConstraints {
            video: false,
            ideal_width: 0,
            ideal_height: 100_000,
            ..MediaConstraints::default()
        }
        .validated();
        assert!(c.video);
        assert_eq!(c.ideal_width, 1);
        assert_eq!(c.ideal_height, MAX_FRAME_DIMENSION);
    }

    #[test]
    fn test_permission_error_maps_to_denied() {
        let err = CameraError::PermissionDenied {
            message: "NotAllowedError".into(),
        };
        assert!(err.is_permission_error());
        let app: AppError = err.into();
        assert_eq!(app.kind, ErrorKind::PermissionDenied);
        assert_eq!(app.message, "Camera Access Denied");
    }

    #[test]
    fn test_raw_frame_debug_omits_pixels() {
        let frame = RawFrame {
            width: 2,
            height: 1,
            rgba: vec![0; 8],
        };
        assert_eq!(format!("{frame:?}"), "RawFrame { width: 2, height: 1, bytes: 8 }");
    }

    #[test]
    fn test_stream_handle_new() {
        let stream = StreamHandle::new("s1", vec!["t1".to_string(), "t2".to_string()]);
        assert_eq!(stream.id, StreamId("s1".into()));
        assert_eq!(stream.tracks.len(), 2);
    }
}
