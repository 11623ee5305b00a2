#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod appointments;
pub mod binder;
pub mod capabilities;
pub mod capture;
pub mod catalog;
pub mod config;
pub mod event;
pub mod flows;
pub mod food_log;
pub mod frame;
pub mod lookup;
pub mod mediator;
pub mod model;
pub mod vitals;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::{DashboardConfig, LateResultPolicy};
pub use crux_core::{render::Render, App as CruxApp};
pub use event::Event;
pub use model::{Model, ViewModel};

pub const DEFAULT_PATIENT_ID: &str = "jane-doe";
pub const PATIENT_PROFILES_PATH: &str = "patientProfiles";
pub const MEDICATIONS_PATH: &str = "medications";
pub const HEALTH_METRICS_PATH: &str = "healthMetrics";

pub const DEFAULT_SCAN_CEILING_MS: u64 = 3_000;
pub const MIN_SCAN_CEILING_MS: u64 = 500;
pub const MAX_SCAN_CEILING_MS: u64 = 30_000;
pub const DEFAULT_JPEG_QUALITY: u8 = 80;
pub const MAX_FRAME_DIMENSION: u32 = 4096;

pub const DEFAULT_FDA_BASE_URL: &str = "https://api.fda.gov";
pub const DEFAULT_FDC_BASE_URL: &str = "https://api.nal.usda.gov/fdc/v1";
pub const DEFAULT_INFERMEDICA_BASE_URL: &str = "https://api.infermedica.com/v3";

pub const MS_PER_HOUR: u64 = 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InputMissing,
    UpstreamUnavailable,
    NotFound,
    PermissionDenied,
    MalformedResponse,
    Timeout,
    Busy,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InputMissing => "INPUT_MISSING",
            Self::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            Self::NotFound => "NOT_FOUND",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::MalformedResponse => "MALFORMED_RESPONSE",
            Self::Timeout => "TIMEOUT",
            Self::Busy => "BUSY",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// Whether the user can sensibly re-trigger the action that failed.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable | Self::Timeout | Self::Busy | Self::MalformedResponse
        )
    }

    #[must_use]
    pub const fn http_status_hint(self) -> Option<u16> {
        match self {
            Self::InputMissing => Some(400),
            Self::NotFound => Some(404),
            Self::MalformedResponse => Some(502),
            Self::UpstreamUnavailable => Some(503),
            Self::Internal => Some(500),
            Self::PermissionDenied | Self::Timeout | Self::Busy => None,
        }
    }

    #[must_use]
    pub const fn from_http_status(status: u16) -> Self {
        match status {
            400 | 422 => Self::InputMissing,
            401 | 403 => Self::PermissionDenied,
            404 => Self::NotFound,
            408 | 504 => Self::Timeout,
            409 | 429 => Self::Busy,
            502 => Self::MalformedResponse,
            503 => Self::UpstreamUnavailable,
            _ => Self::Internal,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::InputMissing | ErrorKind::NotFound => self.message.clone(),
            ErrorKind::UpstreamUnavailable => {
                "The service is temporarily unavailable. Please try again later.".into()
            }
            ErrorKind::PermissionDenied => {
                "Permission was denied. Please check your settings and try again.".into()
            }
            ErrorKind::MalformedResponse => {
                "The service returned a response we could not read. Please try again.".into()
            }
            ErrorKind::Timeout => "The request took too long. Please try again.".into(),
            ErrorKind::Busy => "A request is already in progress. Please wait.".into(),
            ErrorKind::Internal => "An unexpected error occurred. Please try again later.".into(),
        }
    }

    #[must_use]
    pub fn from_http_status(status: u16) -> Self {
        Self::new(ErrorKind::from_http_status(status), format!("HTTP error: {status}"))
            .with_context("http_status", status.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

/// Wall-clock instant supplied by the shell. The core never reads a clock itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnixTimeMs(pub u64);

impl UnixTimeMs {
    #[must_use]
    pub const fn new(ms: u64) -> Self {
        Self(ms)
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn plus_ms(self, ms: u64) -> Self {
        Self(self.0.saturating_add(ms))
    }

    /// Signed distance from `self` to `later`, negative when `later` is in the past.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn millis_until(self, later: UnixTimeMs) -> i64 {
        later.0 as i64 - self.0 as i64
    }
}

impl std::fmt::Display for UnixTimeMs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
