// libs/doctor-cell/src/services/availability.rs

use chrono::{Duration, NaiveDate};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::time::TimeRange;

use crate::models::{AvailableSlot, BookedAppointment, DoctorError};
use crate::services::doctor::DoctorService;

/// Width of a bookable slot.
pub const SLOT_MINUTES: i64 = 30;

pub struct AvailabilityService {
    supabase: SupabaseClient,
    doctor_service: DoctorService,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctor_service: DoctorService::new(config),
        }
    }

    /// Free 30-minute slots for a doctor on a calendar date.
    ///
    /// Read-only: takes no lock and tolerates slightly stale bookings.
    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<AvailableSlot>, DoctorError> {
        debug!("Calculating available slots for doctor {} on {}", doctor_id, date);

        let doctor = self.doctor_service.get_doctor(doctor_id).await?;
        let booked = self.get_appointments_for_date(doctor_id, date).await?;

        let slots = compute_available_slots(doctor.working_hours.window_on(date), &booked);
        debug!("Found {} available slots", slots.len());

        Ok(slots)
    }

    async fn get_appointments_for_date(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<BookedAppointment>, DoctorError> {
        let day_start = date.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let day_end = day_start + Duration::days(1);

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
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let booked: Vec<BookedAppointment> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<BookedAppointment>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse appointments: {}", e)))?;

        Ok(booked)
    }
}

/// Walk the working window in 30-minute steps and keep the steps that touch
/// no existing booking. A trailing window shorter than a full slot is
/// dropped, not emitted short. The booked list may arrive in any order.
pub fn compute_available_slots(
    window: TimeRange,
    booked: &[BookedAppointment],
) -> Vec<AvailableSlot> {
    let mut slots = Vec::new();
    let mut current = window.start;

    loop {
        let slot_end = current + Duration::minutes(SLOT_MINUTES);
        if slot_end > window.end {
            break;
        }

        let slot = TimeRange::new(current, slot_end);
        let is_taken = booked.iter().any(|apt| slot.overlaps(&apt.range()));

        if !is_taken {
            slots.push(AvailableSlot {
                time: current.format("%H:%M").to_string(),
                start_time: current,
                end_time: slot_end,
                available: true,
            });
        }

        current = slot_end;
    }

    slots
}
