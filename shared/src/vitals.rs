//! Manually entered vitals: the latest reading per kind with a low/normal/high
//! status, plus a short newest-first history.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::UnixTimeMs;

pub const HISTORY_LIMIT: usize = 10;

// Filled in when only one side of a blood pressure pair has been entered yet.
const DEFAULT_SYSTOLIC: f64 = 120.0;
const DEFAULT_DIASTOLIC: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VitalKind {
    HeartRate,
    BloodPressure,
    OxygenLevel,
    Temperature,
}

impl VitalKind {
    pub const ALL: [VitalKind; 4] = [
        VitalKind::HeartRate,
        VitalKind::BloodPressure,
        VitalKind::OxygenLevel,
        VitalKind::Temperature,
    ];

    pub fn label(self) -> &'static str {
        match self {
            VitalKind::HeartRate => "Heart Rate",
            VitalKind::BloodPressure => "Blood Pressure",
            VitalKind::OxygenLevel => "Oxygen Level",
            VitalKind::Temperature => "Temperature",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VitalStatus {
    Low,
    #[default]
    Normal,
    High,
}

/// One field as the shell reports it. Blood pressure may arrive one side at a time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum VitalReading {
    HeartRate { bpm: f64 },
    BloodPressure {
        systolic: Option<f64>,
        diastolic: Option<f64>,
    },
    OxygenLevel { percent: f64 },
    Temperature { fahrenheit: f64 },
}

/// A complete measurement, ready to classify.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Vital {
    HeartRate(f64),
    BloodPressure { systolic: f64, diastolic: f64 },
    OxygenLevel(f64),
    Temperature(f64),
}

impl Vital {
    pub fn kind(&self) -> VitalKind {
        match self {
            Vital::HeartRate(_) => VitalKind::HeartRate,
            Vital::BloodPressure { .. } => VitalKind::BloodPressure,
            Vital::OxygenLevel(_) => VitalKind::OxygenLevel,
            Vital::Temperature(_) => VitalKind::Temperature,
        }
    }

    /// High blood pressure wins over low when both sides disagree.
    pub fn status(&self) -> VitalStatus {
        match *self {
            Vital::HeartRate(bpm) if bpm < 60.0 => VitalStatus::Low,
            Vital::HeartRate(bpm) if bpm > 100.0 => VitalStatus::High,
            Vital::BloodPressure {
                systolic,
                diastolic,
            } if systolic > 140.0 || diastolic > 90.0 => VitalStatus::High,
            Vital::BloodPressure {
                systolic,
                diastolic,
            } if systolic < 90.0 || diastolic < 60.0 => VitalStatus::Low,
            Vital::OxygenLevel(percent) if percent < 95.0 => VitalStatus::Low,
            Vital::Temperature(f) if f > 100.4 => VitalStatus::High,
            Vital::Temperature(f) if f < 97.0 => VitalStatus::Low,
            _ => VitalStatus::Normal,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Vital::HeartRate(bpm) => format!("{bpm} bpm"),
            Vital::BloodPressure {
                systolic,
                diastolic,
            } => format!("{systolic}/{diastolic} mmHg"),
            Vital::OxygenLevel(percent) => format!("{percent}%"),
            Vital::Temperature(f) => format!("{f}°F"),
        }
    }

    fn values(&self) -> Vec<f64> {
        match *self {
            Vital::HeartRate(v) | Vital::OxygenLevel(v) | Vital::Temperature(v) => vec![v],
            Vital::BloodPressure {
                systolic,
                diastolic,
            } => vec![systolic, diastolic],
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VitalError {
    #[error("{0} must be a non-negative number")]
    InvalidValue(&'static str),

    #[error("blood pressure needs a systolic or diastolic value")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalHistoryEntry {
    pub kind: VitalKind,
    pub value: String,
    pub status: VitalStatus,
    pub recorded_at: UnixTimeMs,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalsPanel {
    heart_rate: Option<Vital>,
    blood_pressure: Option<Vital>,
    oxygen_level: Option<Vital>,
    temperature: Option<Vital>,
    history: Vec<VitalHistoryEntry>,
}

impl VitalsPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self, kind: VitalKind) -> Option<&Vital> {
        match kind {
            VitalKind::HeartRate => self.heart_rate.as_ref(),
            VitalKind::BloodPressure => self.blood_pressure.as_ref(),
            VitalKind::OxygenLevel => self.oxygen_level.as_ref(),
            VitalKind::Temperature => self.temperature.as_ref(),
        }
    }

    /// Newest first.
    pub fn history(&self) -> &[VitalHistoryEntry] {
        &self.history
    }

    pub fn record(&mut self, reading: VitalReading, now: UnixTimeMs) -> Result<VitalStatus, VitalError> {
        let vital = self.resolve(reading)?;
        if vital.values().iter().any(|v| !v.is_finite() || *v < 0.0) {
            warn!(kind = ?vital.kind(), "rejected vital reading");
            return Err(VitalError::InvalidValue(vital.kind().label()));
        }

        let status = vital.status();
        let slot = match vital.kind() {
            VitalKind::HeartRate => &mut self.heart_rate,
            VitalKind::BloodPressure => &mut self.blood_pressure,
            VitalKind::OxygenLevel => &mut self.oxygen_level,
            VitalKind::Temperature => &mut self.temperature,
        };
        *slot = Some(vital);

        self.history.insert(
            0,
            VitalHistoryEntry {
                kind: vital.kind(),
                value: vital.display(),
                status,
                recorded_at: now,
            },
        );
        self.history.truncate(HISTORY_LIMIT);
        debug!(kind = ?vital.kind(), ?status, "vital recorded");
        Ok(status)
    }

    fn resolve(&self, reading: VitalReading) -> Result<Vital, VitalError> {
        Ok(match reading {
            VitalReading::HeartRate { bpm } => Vital::HeartRate(bpm),
            VitalReading::OxygenLevel { percent } => Vital::OxygenLevel(percent),
            VitalReading::Temperature { fahrenheit } => Vital::Temperature(fahrenheit),
            VitalReading::BloodPressure {
                systolic: None,
                diastolic: None,
            } => return Err(VitalError::Empty),
            VitalReading::BloodPressure {
                systolic,
                diastolic,
            } => {
                let (last_sys, last_dia) = match self.blood_pressure {
                    Some(Vital::BloodPressure {
                        systolic,
                        diastolic,
                    }) => (systolic, diastolic),
                    _ => (DEFAULT_SYSTOLIC, DEFAULT_DIASTOLIC),
                };
                Vital::BloodPressure {
                    systolic: systolic.unwrap_or(last_sys),
                    diastolic: diastolic.unwrap_or(last_dia),
                }
            }
        })
    }
}
