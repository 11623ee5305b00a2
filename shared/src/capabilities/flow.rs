use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AppError, ErrorKind};

/// Generative flow service. Replies are returned as raw text and interpreted
/// in the core, because the upstream does not reliably honour its schema.
pub struct Flow<E> {
    context: CapabilityContext<FlowOperation, E>,
}

impl<Ev> Capability<Ev> for Flow<Ev> {
    type Operation = FlowOperation;
    type MappedSelf<MappedEv> = Flow<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Flow::new(self.context.map_event(f))
    }
}

impl<E> Flow<E>
where
    E: Send + 'static,
{
    pub fn new(context: CapabilityContext<FlowOperation, E>) -> Self {
        Self { context }
    }

    pub fn invoke<F>(&self, request: FlowRequest, make_event: F)
    where
        F: FnOnce(FlowResult) -> E + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let output = ctx.request_from_shell(FlowOperation::Invoke(request)).await;
            ctx.update_app(make_event(output));
        });
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowRequest {
    SummarizeSymptoms { text: String },
    SummarizeMedicalMedia { media_data_uri: String },
    DetectHumanPresence { media_data_uri: String },
}

impl FlowRequest {
    pub fn name(&self) -> &'static str {
        match self {
            FlowRequest::SummarizeSymptoms { .. } => "summarize_symptoms",
            FlowRequest::SummarizeMedicalMedia { .. } => "summarize_medical_media",
            FlowRequest::DetectHumanPresence { .. } => "detect_human_presence",
        }
    }

    fn payload_len(&self) -> usize {
        match self {
            FlowRequest::SummarizeSymptoms { text } => text.len(),
            FlowRequest::SummarizeMedicalMedia { media_data_uri }
            | FlowRequest::DetectHumanPresence { media_data_uri } => media_data_uri.len(),
        }
    }
}

// Media payloads are large and patient data; keep them out of logs.
impl std::fmt::Debug for FlowRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowRequest")
            .field("flow", &self.name())
            .field("payload_bytes", &self.payload_len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowOperation {
    Invoke(FlowRequest),
}

impl Operation for FlowOperation {
    type Output = FlowResult;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowReply {
    pub text: String,
}

impl FlowReply {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowError {
    #[error("flow service unavailable: {message}")]
    Unavailable { message: String },

    #[error("flow rejected the request: {message}")]
    Rejected { message: String },

    #[error("flow invocation failed: {message}")]
    Failed { message: String },
}

impl FlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlowError::Unavailable { .. } => ErrorKind::UpstreamUnavailable,
            FlowError::Rejected { .. } => ErrorKind::InputMissing,
            FlowError::Failed { .. } => ErrorKind::Internal,
        }
    }
}

impl From<FlowError> for AppError {
    fn from(err: FlowError) -> Self {
        AppError::new(err.kind(), "An unexpected error occurred. Please try again later.")
            .with_internal(err.to_string())
    }
}

pub type FlowResult = Result<FlowReply, FlowError>;
