// libs/appointment-cell/src/services/booking.rs
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::models::DoctorError;
use doctor_cell::services::doctor::DoctorService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::time::TimeRange;

use crate::models::{
    Appointment, AppointmentSearchQuery, CreateAppointmentRequest, ScheduleError,
    UpdateAppointmentRequest, ALLOWED_DURATIONS, MAX_NOTES_LENGTH, MIN_PATIENT_NAME_LENGTH,
};
use crate::services::locking::DoctorScheduleLock;
use crate::services::schedule;

pub struct BookingService {
    supabase: Arc<SupabaseClient>,
    doctor_service: DoctorService,
    schedule_lock: DoctorScheduleLock,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self {
            doctor_service: DoctorService::new(config),
            schedule_lock: DoctorScheduleLock::new(Arc::clone(&supabase)),
            supabase,
        }
    }

    /// Validate and create a booking.
    ///
    /// Pipeline: field validation → doctor lookup → working-hours check →
    /// per-doctor lock → conflict scan → insert. Nothing is persisted on any
    /// failure, and the record only becomes visible once the insert returns.
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, ScheduleError> {
        info!("Booking appointment with doctor {} at {}",
              request.doctor_id, request.start_time);

        validate_duration(request.duration_minutes)?;
        validate_patient_name(&request.patient_name)?;
        validate_notes(request.notes.as_deref())?;

        if request.start_time <= Utc::now() {
            return Err(ScheduleError::ValidationError(
                "Appointment date must be in the future".to_string(),
            ));
        }

        let doctor = self.doctor_service.get_doctor(request.doctor_id).await
            .map_err(doctor_lookup_error)?;

        let candidate = range_of(request.start_time, request.duration_minutes);
        schedule::check_working_hours(&candidate, &doctor.working_hours)?;

        // The conflict scan and the insert must be atomic per doctor.
        self.schedule_lock.acquire(request.doctor_id).await?;
        let outcome = self.insert_if_free(&request, &candidate).await;
        self.schedule_lock.release(request.doctor_id).await?;

        let appointment = outcome?;
        info!("Appointment {} booked with doctor {}", appointment.id, request.doctor_id);
        Ok(appointment)
    }

    /// Apply a patch to an existing booking.
    ///
    /// A patch that touches `start_time` or `duration_minutes` re-runs the
    /// full validation pipeline with the appointment's own interval excluded
    /// from the conflict scan. Non-temporal patches are applied after
    /// structural checks alone.
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, ScheduleError> {
        debug!("Updating appointment: {}", appointment_id);

        let current = self.get_appointment(appointment_id).await?;

        if let Some(duration) = request.duration_minutes {
            validate_duration(duration)?;
        }
        if let Some(name) = &request.patient_name {
            validate_patient_name(name)?;
        }
        validate_notes(request.notes.as_deref())?;

        if !request.changes_schedule() {
            return self.patch_appointment(appointment_id, &request).await;
        }

        let new_start = request.start_time.unwrap_or(current.start_time);
        let new_duration = request.duration_minutes.unwrap_or(current.duration_minutes);

        if new_start <= Utc::now() {
            return Err(ScheduleError::ValidationError(
                "Appointment date must be in the future".to_string(),
            ));
        }

        let doctor = self.doctor_service.get_doctor(current.doctor_id).await
            .map_err(doctor_lookup_error)?;

        let candidate = range_of(new_start, new_duration);
        schedule::check_working_hours(&candidate, &doctor.working_hours)?;

        self.schedule_lock.acquire(current.doctor_id).await?;
        let outcome = self
            .patch_if_free(appointment_id, current.doctor_id, &candidate, &request)
            .await;
        self.schedule_lock.release(current.doctor_id).await?;

        let updated = outcome?;
        info!("Appointment {} rescheduled to {}", appointment_id, new_start);
        Ok(updated)
    }

    /// Cancel a booking. Cancelling an id that was never created is an
    /// error, not a no-op.
    pub async fn cancel_appointment(&self, appointment_id: Uuid) -> Result<(), ScheduleError> {
        debug!("Cancelling appointment: {}", appointment_id);

        let appointment = self.get_appointment(appointment_id).await?;

        let _: Value = self.supabase.request(
            Method::DELETE,
            &format!("/rest/v1/appointments?id=eq.{}", appointment_id),
            None,
        ).await.map_err(|e| ScheduleError::DatabaseError(e.to_string()))?;

        info!("Appointment {} with doctor {} cancelled",
              appointment_id, appointment.doctor_id);
        Ok(())
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, ScheduleError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            None,
        ).await.map_err(|e| ScheduleError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(ScheduleError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| ScheduleError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }

    pub async fn search_appointments(
        &self,
        query: AppointmentSearchQuery,
    ) -> Result<Vec<Appointment>, ScheduleError> {
        debug!("Searching appointments with filters: {:?}", query);

        let mut query_parts = Vec::new();

        if let Some(doctor_id) = query.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(from_date) = query.from_date {
            query_parts.push(format!("start_time=gte.{}", urlencoding::encode(&from_date.to_rfc3339())));
        }
        if let Some(to_date) = query.to_date {
            query_parts.push(format!("start_time=lte.{}", urlencoding::encode(&to_date.to_rfc3339())));
        }
        query_parts.push("order=start_time.asc".to_string());

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            None,
        ).await.map_err(|e| ScheduleError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Appointment>, _>>()
            .map_err(|e| ScheduleError::DatabaseError(format!("Failed to parse appointments: {}", e)))
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    async fn insert_if_free(
        &self,
        request: &CreateAppointmentRequest,
        candidate: &TimeRange,
    ) -> Result<Appointment, ScheduleError> {
        let existing = self
            .appointments_for_day(request.doctor_id, request.start_time.date_naive())
            .await?;

        if let Some(conflicting_id) = schedule::find_conflict(candidate, &existing, None) {
            warn!("Slot conflict for doctor {}: appointment {}",
                  request.doctor_id, conflicting_id);
            return Err(ScheduleError::SlotConflict { conflicting_id });
        }

        self.insert_appointment(request).await
    }

    async fn patch_if_free(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
        candidate: &TimeRange,
        request: &UpdateAppointmentRequest,
    ) -> Result<Appointment, ScheduleError> {
        let existing = self
            .appointments_for_day(doctor_id, candidate.start.date_naive())
            .await?;

        if let Some(conflicting_id) =
            schedule::find_conflict(candidate, &existing, Some(appointment_id))
        {
            warn!("Slot conflict for doctor {}: appointment {}", doctor_id, conflicting_id);
            return Err(ScheduleError::SlotConflict { conflicting_id });
        }

        self.patch_appointment(appointment_id, request).await
    }

    async fn appointments_for_day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, ScheduleError> {
        let day_start = date.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let day_end = day_start + ChronoDuration::days(1);

        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&start_time=gte.{}&start_time=lt.{}&order=start_time.asc",
            doctor_id,
            urlencoding::encode(&day_start.to_rfc3339()),
            urlencoding::encode(&day_end.to_rfc3339()),
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            None,
        ).await.map_err(|e| ScheduleError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Appointment>, _>>()
            .map_err(|e| ScheduleError::DatabaseError(format!("Failed to parse appointments: {}", e)))
    }

    async fn insert_appointment(
        &self,
        request: &CreateAppointmentRequest,
    ) -> Result<Appointment, ScheduleError> {
        let appointment_data = json!({
            "doctor_id": request.doctor_id,
            "start_time": request.start_time.to_rfc3339(),
            "duration_minutes": request.duration_minutes,
            "appointment_type": request.appointment_type,
            "patient_name": request.patient_name.trim(),
            "notes": request.notes.as_deref().map(str::trim),
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(appointment_data),
            Some(headers),
        ).await.map_err(|e| ScheduleError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(ScheduleError::DatabaseError("Failed to create appointment".to_string()));
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| ScheduleError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }

    async fn patch_appointment(
        &self,
        appointment_id: Uuid,
        request: &UpdateAppointmentRequest,
    ) -> Result<Appointment, ScheduleError> {
        let mut update_data = Map::new();

        if let Some(start_time) = request.start_time {
            update_data.insert("start_time".to_string(), json!(start_time.to_rfc3339()));
        }
        if let Some(duration) = request.duration_minutes {
            update_data.insert("duration_minutes".to_string(), json!(duration));
        }
        if let Some(appointment_type) = &request.appointment_type {
            update_data.insert("appointment_type".to_string(), json!(appointment_type));
        }
        if let Some(patient_name) = &request.patient_name {
            update_data.insert("patient_name".to_string(), json!(patient_name.trim()));
        }
        if let Some(notes) = &request.notes {
            update_data.insert("notes".to_string(), json!(notes.trim()));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(Value::Object(update_data)),
            Some(headers),
        ).await.map_err(|e| ScheduleError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(ScheduleError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| ScheduleError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }
}

fn range_of(start: DateTime<Utc>, duration_minutes: i32) -> TimeRange {
    TimeRange::new(start, start + ChronoDuration::minutes(duration_minutes as i64))
}

fn doctor_lookup_error(err: DoctorError) -> ScheduleError {
    match err {
        DoctorError::NotFound => ScheduleError::DoctorNotFound,
        DoctorError::ValidationError(msg) => ScheduleError::ValidationError(msg),
        DoctorError::DatabaseError(msg) => ScheduleError::DatabaseError(msg),
    }
}

fn validate_duration(duration_minutes: i32) -> Result<(), ScheduleError> {
    if !ALLOWED_DURATIONS.contains(&duration_minutes) {
        return Err(ScheduleError::ValidationError(
            "Duration must be either 30 or 60 minutes".to_string(),
        ));
    }
    Ok(())
}

fn validate_patient_name(patient_name: &str) -> Result<(), ScheduleError> {
    if patient_name.trim().chars().count() < MIN_PATIENT_NAME_LENGTH {
        return Err(ScheduleError::ValidationError(
            "Patient name must be at least 2 characters long".to_string(),
        ));
    }
    Ok(())
}

fn validate_notes(notes: Option<&str>) -> Result<(), ScheduleError> {
    if let Some(notes) = notes {
        if notes.trim().chars().count() > MAX_NOTES_LENGTH {
            return Err(ScheduleError::ValidationError(
                "Notes cannot exceed 500 characters".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_duration_enum() {
        assert!(validate_duration(30).is_ok());
        assert!(validate_duration(60).is_ok());
        assert_matches!(validate_duration(45), Err(ScheduleError::ValidationError(_)));
        assert_matches!(validate_duration(0), Err(ScheduleError::ValidationError(_)));
    }

    #[test]
    fn test_patient_name_minimum_length() {
        assert!(validate_patient_name("Jo").is_ok());
        assert_matches!(validate_patient_name("J"), Err(ScheduleError::ValidationError(_)));
        // Whitespace padding does not count toward the minimum.
        assert_matches!(validate_patient_name(" J "), Err(ScheduleError::ValidationError(_)));
    }

    #[test]
    fn test_notes_maximum_length() {
        assert!(validate_notes(None).is_ok());
        assert!(validate_notes(Some("short note")).is_ok());

        let too_long = "x".repeat(MAX_NOTES_LENGTH + 1);
        assert_matches!(validate_notes(Some(&too_long)), Err(ScheduleError::ValidationError(_)));
    }
}
