//! Pure scheduling checks. No clock, no I/O: callers fetch the data and
//! pass it in, which keeps both checks trivially testable.

use uuid::Uuid;

use doctor_cell::models::WorkingHours;
use shared_models::time::TimeRange;

use crate::models::{Appointment, ScheduleError};

/// Validate that a candidate interval lies fully inside the doctor's working
/// window on the candidate's calendar day.
///
/// The window is anchored to the candidate start's date. An interval that
/// runs past midnight can never fit, since working hours cover a single
/// calendar day. Ending exactly at close is allowed.
pub fn check_working_hours(
    candidate: &TimeRange,
    hours: &WorkingHours,
) -> Result<(), ScheduleError> {
    let date = candidate.start.date_naive();

    if candidate.end.date_naive() != date {
        return Err(ScheduleError::OutsideWorkingHours);
    }

    let window = hours.window_on(date);
    if !window.contains(candidate) {
        return Err(ScheduleError::OutsideWorkingHours);
    }

    Ok(())
}

/// Scan a doctor's existing appointments for one that overlaps the
/// candidate, returning the first colliding id. `exclude` skips the
/// appointment's own stored state during an edit; exclusion is by identity,
/// never by interval coincidence.
pub fn find_conflict(
    candidate: &TimeRange,
    existing: &[Appointment],
    exclude: Option<Uuid>,
) -> Option<Uuid> {
    existing
        .iter()
        .filter(|apt| Some(apt.id) != exclude)
        .find(|apt| candidate.overlaps(&apt.range()))
        .map(|apt| apt.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{DateTime, TimeZone, Utc};

    use crate::models::AppointmentType;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2031, 5, 20, hour, min, 0).unwrap()
    }

    fn nine_to_five() -> WorkingHours {
        serde_json::from_value(serde_json::json!({ "start": "09:00", "end": "17:00" })).unwrap()
    }

    fn appointment(start: DateTime<Utc>, duration_minutes: i32) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            start_time: start,
            duration_minutes,
            appointment_type: AppointmentType::RoutineCheckUp,
            patient_name: "Jane Roe".to_string(),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_interval_inside_window_accepted() {
        let candidate = TimeRange::new(at(10, 0), at(10, 30));
        assert!(check_working_hours(&candidate, &nine_to_five()).is_ok());
    }

    #[test]
    fn test_interval_ending_at_close_accepted() {
        let candidate = TimeRange::new(at(16, 30), at(17, 0));
        assert!(check_working_hours(&candidate, &nine_to_five()).is_ok());
    }

    #[test]
    fn test_interval_ending_past_close_rejected() {
        let candidate = TimeRange::new(at(16, 31), at(17, 1));
        assert_matches!(
            check_working_hours(&candidate, &nine_to_five()),
            Err(ScheduleError::OutsideWorkingHours)
        );
    }

    #[test]
    fn test_interval_before_opening_rejected() {
        let candidate = TimeRange::new(at(8, 30), at(9, 0));
        assert_matches!(
            check_working_hours(&candidate, &nine_to_five()),
            Err(ScheduleError::OutsideWorkingHours)
        );
    }

    #[test]
    fn test_interval_starting_at_opening_accepted() {
        let candidate = TimeRange::new(at(9, 0), at(9, 30));
        assert!(check_working_hours(&candidate, &nine_to_five()).is_ok());
    }

    #[test]
    fn test_midnight_spanning_interval_rejected() {
        let hours: WorkingHours =
            serde_json::from_value(serde_json::json!({ "start": "09:00", "end": "23:59" })).unwrap();
        let candidate = TimeRange::new(
            Utc.with_ymd_and_hms(2031, 5, 20, 23, 30, 0).unwrap(),
            Utc.with_ymd_and_hms(2031, 5, 21, 0, 30, 0).unwrap(),
        );
        assert_matches!(
            check_working_hours(&candidate, &hours),
            Err(ScheduleError::OutsideWorkingHours)
        );
    }

    #[test]
    fn test_overlapping_candidate_reports_conflict() {
        let existing = appointment(at(11, 0), 60);
        let existing_id = existing.id;

        let candidate = TimeRange::new(at(11, 0), at(11, 30));
        assert_eq!(
            find_conflict(&candidate, &[existing], None),
            Some(existing_id)
        );
    }

    #[test]
    fn test_back_to_back_candidate_is_not_a_conflict() {
        let existing = appointment(at(10, 0), 30);

        let candidate = TimeRange::new(at(10, 30), at(11, 0));
        assert_eq!(find_conflict(&candidate, &[existing], None), None);
    }

    #[test]
    fn test_one_minute_overlap_is_a_conflict() {
        let existing = appointment(at(10, 0), 30);

        let candidate = TimeRange::new(at(10, 29), at(10, 59));
        assert!(find_conflict(&candidate, &[existing], None).is_some());
    }

    #[test]
    fn test_edit_excludes_own_record_by_identity() {
        let existing = appointment(at(10, 0), 30);
        let own_id = existing.id;

        // Re-validating an unchanged interval must not collide with itself.
        let candidate = TimeRange::new(at(10, 0), at(10, 30));
        assert_eq!(find_conflict(&candidate, &[existing], Some(own_id)), None);
    }

    #[test]
    fn test_edit_exclusion_does_not_hide_other_conflicts() {
        let own = appointment(at(10, 0), 30);
        let own_id = own.id;
        let other = appointment(at(10, 30), 30);
        let other_id = other.id;

        let candidate = TimeRange::new(at(10, 0), at(11, 0));
        assert_eq!(
            find_conflict(&candidate, &[own, other], Some(own_id)),
            Some(other_id)
        );
    }

    #[test]
    fn test_scan_short_circuits_on_first_overlap() {
        let first = appointment(at(10, 0), 60);
        let first_id = first.id;
        let second = appointment(at(10, 30), 60);

        let candidate = TimeRange::new(at(10, 15), at(10, 45));
        assert_eq!(
            find_conflict(&candidate, &[first, second], None),
            Some(first_id)
        );
    }
}
