// libs/doctor-cell/src/models.rs
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::time::TimeRange;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub specialization: Option<String>,
    pub working_hours: WorkingHours,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Daily window during which a doctor accepts appointments.
///
/// The wire form is a pair of `"HH:MM"` strings. Parsing and validation
/// happen once, here; everything downstream works with typed times.
/// Overnight windows (start >= end) are rejected outright.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWorkingHours", into = "RawWorkingHours")]
pub struct WorkingHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl WorkingHours {
    /// The working window anchored to a calendar date, derived as two
    /// independent instants.
    pub fn window_on(&self, date: NaiveDate) -> TimeRange {
        TimeRange::new(
            date.and_time(self.start).and_utc(),
            date.and_time(self.end).and_utc(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawWorkingHours {
    start: String,
    end: String,
}

impl TryFrom<RawWorkingHours> for WorkingHours {
    type Error = String;

    fn try_from(raw: RawWorkingHours) -> Result<Self, Self::Error> {
        let start = parse_hhmm(&raw.start)?;
        let end = parse_hhmm(&raw.end)?;

        if start >= end {
            return Err(format!(
                "working hours must start before they end ({} >= {})",
                raw.start, raw.end
            ));
        }

        Ok(Self { start, end })
    }
}

impl From<WorkingHours> for RawWorkingHours {
    fn from(hours: WorkingHours) -> Self {
        Self {
            start: hours.start.format("%H:%M").to_string(),
            end: hours.end.format("%H:%M").to_string(),
        }
    }
}

fn parse_hhmm(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| format!("{} is not a valid time format", value))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub name: String,
    pub specialization: Option<String>,
    pub working_hours: WorkingHours,
}

/// The slice of an appointment record that slot computation needs.
#[derive(Debug, Clone, Deserialize)]
pub struct BookedAppointment {
    pub id: Uuid,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i32,
}

impl BookedAppointment {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(
            self.start_time,
            self.start_time + Duration::minutes(self.duration_minutes as i64),
        )
    }
}

/// A bookable 30-minute window. Occupied windows are filtered out before
/// they reach the caller, so `available` is always true on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub time: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
            DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
            DoctorError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours(json: serde_json::Value) -> Result<WorkingHours, serde_json::Error> {
        serde_json::from_value(json)
    }

    #[test]
    fn test_working_hours_parse() {
        let parsed = hours(serde_json::json!({ "start": "09:00", "end": "17:00" })).unwrap();
        assert_eq!(parsed.start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(parsed.end, NaiveTime::from_hms_opt(17, 0, 0).unwrap());
    }

    #[test]
    fn test_working_hours_accept_single_digit_hour() {
        assert!(hours(serde_json::json!({ "start": "9:30", "end": "17:00" })).is_ok());
    }

    #[test]
    fn test_working_hours_reject_bad_time() {
        assert!(hours(serde_json::json!({ "start": "25:00", "end": "17:00" })).is_err());
        assert!(hours(serde_json::json!({ "start": "nine", "end": "17:00" })).is_err());
    }

    #[test]
    fn test_working_hours_reject_overnight_window() {
        assert!(hours(serde_json::json!({ "start": "17:00", "end": "09:00" })).is_err());
        assert!(hours(serde_json::json!({ "start": "09:00", "end": "09:00" })).is_err());
    }

    #[test]
    fn test_working_hours_serialize_as_hhmm() {
        let parsed = hours(serde_json::json!({ "start": "9:05", "end": "17:00" })).unwrap();
        let value = serde_json::to_value(parsed).unwrap();
        assert_eq!(value, serde_json::json!({ "start": "09:05", "end": "17:00" }));
    }

    #[test]
    fn test_window_on_anchors_to_date() {
        let parsed = hours(serde_json::json!({ "start": "09:00", "end": "17:00" })).unwrap();
        let date = NaiveDate::from_ymd_opt(2031, 5, 20).unwrap();
        let window = parsed.window_on(date);
        assert_eq!(window.start.to_rfc3339(), "2031-05-20T09:00:00+00:00");
        assert_eq!(window.end.to_rfc3339(), "2031-05-20T17:00:00+00:00");
    }
}
