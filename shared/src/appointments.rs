use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::event::AppointmentId;
use crate::{AppError, ErrorKind, UnixTimeMs, MS_PER_HOUR};

pub const FIELDS_REQUIRED: &str = "Please fill in required fields";
pub const DEFAULT_APPOINTMENT_KIND: &str = "General Checkup";

// Reminder windows, in minutes before the appointment, exclusive at both ends.
const DAY_WINDOW_MIN: (u64, u64) = (23 * 60 + 30, 24 * 60 + 30);
const HOUR_WINDOW_MIN: (u64, u64) = (30, 90);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewAppointment {
    pub patient_name: String,
    pub doctor_name: String,
    pub kind: String,
    /// Resolved by the shell from the local date and time inputs.
    pub scheduled_at: Option<UnixTimeMs>,
    pub phone: String,
    pub email: String,
}

impl Default for NewAppointment {
    fn default() -> Self {
        Self {
            patient_name: String::new(),
            doctor_name: String::new(),
            kind: DEFAULT_APPOINTMENT_KIND.to_string(),
            scheduled_at: None,
            phone: String::new(),
            email: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_name: String,
    pub doctor_name: String,
    pub kind: String,
    pub scheduled_at: UnixTimeMs,
    pub phone: String,
    pub email: String,
    pub created_at: UnixTimeMs,
    pub reminded_day_before: bool,
    pub reminded_hour_before: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Completed,
    StartingSoon,
    Today,
    Upcoming,
}

impl AppointmentStatus {
    pub fn at(scheduled_at: UnixTimeMs, now: UnixTimeMs) -> Self {
        let remaining = now.millis_until(scheduled_at);
        match remaining {
            r if r < 0 => AppointmentStatus::Completed,
            r if r < hours(1) => AppointmentStatus::StartingSoon,
            r if r < hours(24) => AppointmentStatus::Today,
            _ => AppointmentStatus::Upcoming,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::StartingSoon => "Starting Soon",
            AppointmentStatus::Today => "Today",
            AppointmentStatus::Upcoming => "Upcoming",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReminderWindow {
    DayBefore,
    HourBefore,
}

impl ReminderWindow {
    pub fn timeframe(self) -> &'static str {
        match self {
            ReminderWindow::DayBefore => "24 hours",
            ReminderWindow::HourBefore => "1 hour",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub appointment: AppointmentId,
    pub window: ReminderWindow,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentBook {
    appointments: Vec<Appointment>,
}

impl AppointmentBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn add(&mut self, draft: NewAppointment, now: UnixTimeMs) -> Result<AppointmentId, AppError> {
        let Some(scheduled_at) = draft.scheduled_at else {
            return Err(AppError::new(ErrorKind::InputMissing, FIELDS_REQUIRED)
                .with_context("field", "scheduled_at"));
        };
        if draft.patient_name.trim().is_empty() {
            return Err(AppError::new(ErrorKind::InputMissing, FIELDS_REQUIRED)
                .with_context("field", "patient_name"));
        }

        let id = AppointmentId::new(uuid::Uuid::new_v4().to_string());
        let kind = if draft.kind.trim().is_empty() {
            DEFAULT_APPOINTMENT_KIND.to_string()
        } else {
            draft.kind
        };
        self.appointments.push(Appointment {
            id: id.clone(),
            patient_name: draft.patient_name.trim().to_string(),
            doctor_name: draft.doctor_name.trim().to_string(),
            kind,
            scheduled_at,
            phone: draft.phone,
            email: draft.email,
            created_at: now,
            reminded_day_before: false,
            reminded_hour_before: false,
        });
        info!(%id, at = %scheduled_at, "appointment added");
        Ok(id)
    }

    pub fn remove(&mut self, id: &AppointmentId) -> bool {
        let before = self.appointments.len();
        self.appointments.retain(|a| &a.id != id);
        before != self.appointments.len()
    }

    pub fn status(&self, id: &AppointmentId, now: UnixTimeMs) -> Option<AppointmentStatus> {
        self.appointments
            .iter()
            .find(|a| &a.id == id)
            .map(|a| AppointmentStatus::at(a.scheduled_at, now))
    }

    /// Reminders that fall due at `now`. Each window fires at most once per
    /// appointment; the fired flag is recorded here.
    pub fn due_reminders(&mut self, now: UnixTimeMs) -> Vec<Reminder> {
        let mut due = Vec::new();
        for appointment in &mut self.appointments {
            let remaining = now.millis_until(appointment.scheduled_at);

            if !appointment.reminded_day_before && within(remaining, DAY_WINDOW_MIN) {
                appointment.reminded_day_before = true;
                due.push(reminder(appointment, ReminderWindow::DayBefore));
            }
            if !appointment.reminded_hour_before && within(remaining, HOUR_WINDOW_MIN) {
                appointment.reminded_hour_before = true;
                due.push(reminder(appointment, ReminderWindow::HourBefore));
            }
        }
        debug!(due = due.len(), "reminder tick");
        due
    }
}

fn reminder(appointment: &Appointment, window: ReminderWindow) -> Reminder {
    Reminder {
        appointment: appointment.id.clone(),
        window,
        message: format!(
            "Your appointment with Dr. {} is in {}",
            appointment.doctor_name,
            window.timeframe()
        ),
    }
}

fn within(remaining_ms: i64, (low_min, high_min): (u64, u64)) -> bool {
    let low = minutes(low_min);
    let high = minutes(high_min);
    remaining_ms > low && remaining_ms < high
}

#[allow(clippy::cast_possible_wrap)]
const fn hours(h: u64) -> i64 {
    (h * MS_PER_HOUR) as i64
}

#[allow(clippy::cast_possible_wrap)]
const fn minutes(m: u64) -> i64 {
    (m * 60 * 1000) as i64
}
