// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::time::TimeRange;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// Durations a booking may take, in minutes.
pub const ALLOWED_DURATIONS: [i32; 2] = [30, 60];
pub const MIN_PATIENT_NAME_LENGTH: usize = 2;
pub const MAX_NOTES_LENGTH: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub appointment_type: AppointmentType,
    pub patient_name: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + Duration::minutes(self.duration_minutes as i64)
    }

    /// The half-open interval this appointment occupies.
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AppointmentType {
    #[serde(rename = "Routine Check-Up")]
    RoutineCheckUp,

    #[serde(rename = "Ultrasound")]
    Ultrasound,

    #[serde(rename = "Follow-up")]
    FollowUp,
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::RoutineCheckUp => write!(f, "Routine Check-Up"),
            AppointmentType::Ultrasound => write!(f, "Ultrasound"),
            AppointmentType::FollowUp => write!(f, "Follow-up"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub appointment_type: AppointmentType,
    pub patient_name: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub start_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub appointment_type: Option<AppointmentType>,
    pub patient_name: Option<String>,
    pub notes: Option<String>,
}

impl UpdateAppointmentRequest {
    /// A patch that moves or resizes the interval must re-run the full
    /// working-hours and conflict pipeline.
    pub fn changes_schedule(&self) -> bool {
        self.start_time.is_some() || self.duration_minutes.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub doctor_id: Option<Uuid>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum ScheduleError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Appointment time is outside doctor's working hours")]
    OutsideWorkingHours,

    #[error("This time slot is already booked")]
    SlotConflict { conflicting_id: Uuid },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::NotFound => {
                AppError::NotFound("Appointment not found".to_string())
            }
            ScheduleError::DoctorNotFound => {
                AppError::NotFound("Doctor not found".to_string())
            }
            ScheduleError::OutsideWorkingHours => {
                AppError::BadRequest("Appointment time is outside doctor's working hours".to_string())
            }
            ScheduleError::SlotConflict { .. } => {
                AppError::Conflict("This time slot is already booked".to_string())
            }
            ScheduleError::ValidationError(msg) => AppError::ValidationError(msg),
            ScheduleError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
