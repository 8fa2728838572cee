// libs/appointment-cell/src/services/locking.rs
//
// Per-doctor mutual exclusion for booking writes. The conflict check and the
// insert that follows it must be atomic with respect to other bookings for
// the same doctor; a lock row in the record store serializes them.

use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::ScheduleError;

pub struct DoctorScheduleLock {
    supabase: Arc<SupabaseClient>,
    lock_timeout_seconds: i64,
    max_retry_attempts: u32,
}

impl DoctorScheduleLock {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            supabase,
            lock_timeout_seconds: 30,
            max_retry_attempts: 3,
        }
    }

    /// Acquire the lock for a doctor, retrying with backoff while another
    /// booking holds it. Gives up after the configured attempts.
    pub async fn acquire(&self, doctor_id: Uuid) -> Result<(), ScheduleError> {
        let lock_key = Self::lock_key(doctor_id);

        for attempt in 1..=self.max_retry_attempts {
            debug!("Lock attempt {} for doctor {}", attempt, doctor_id);

            if self.try_acquire(&lock_key, doctor_id).await? {
                return Ok(());
            }

            if attempt < self.max_retry_attempts {
                tokio::time::sleep(std::time::Duration::from_millis(100 * attempt as u64)).await;
            }
        }

        warn!("Could not acquire schedule lock for doctor {}", doctor_id);
        Err(ScheduleError::DatabaseError(
            "Doctor schedule is locked by another booking".to_string(),
        ))
    }

    pub async fn release(&self, doctor_id: Uuid) -> Result<(), ScheduleError> {
        let lock_key = Self::lock_key(doctor_id);

        let _: Value = self.supabase.request(
            Method::DELETE,
            &format!("/rest/v1/scheduling_locks?lock_key=eq.{}", lock_key),
            None,
        ).await.map_err(|e| ScheduleError::DatabaseError(format!("Lock release failed: {}", e)))?;

        debug!("Schedule lock released: {}", lock_key);
        Ok(())
    }

    async fn try_acquire(&self, lock_key: &str, doctor_id: Uuid) -> Result<bool, ScheduleError> {
        // The unique lock_key makes the insert fail while another holder's
        // row exists.
        match self.insert_lock_row(lock_key, doctor_id).await {
            Ok(()) => {
                debug!("Schedule lock acquired: {}", lock_key);
                Ok(true)
            }
            Err(_) => {
                // A stale row past its expiry is cleaned up so the next
                // insert can succeed.
                if self.cleanup_expired_lock(lock_key).await? {
                    Ok(self.insert_lock_row(lock_key, doctor_id).await.is_ok())
                } else {
                    Ok(false)
                }
            }
        }
    }

    async fn insert_lock_row(&self, lock_key: &str, doctor_id: Uuid) -> Result<(), ScheduleError> {
        let lock_data = json!({
            "lock_key": lock_key,
            "doctor_id": doctor_id,
            "acquired_at": Utc::now().to_rfc3339(),
            "expires_at": (Utc::now() + Duration::seconds(self.lock_timeout_seconds)).to_rfc3339()
        });

        self.supabase.request::<Value>(
            Method::POST,
            "/rest/v1/scheduling_locks",
            Some(lock_data),
        ).await.map_err(|e| ScheduleError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn cleanup_expired_lock(&self, lock_key: &str) -> Result<bool, ScheduleError> {
        let response: Value = self.supabase.request(
            Method::GET,
            &format!("/rest/v1/scheduling_locks?lock_key=eq.{}&select=*", lock_key),
            None,
        ).await.map_err(|e| ScheduleError::DatabaseError(format!("Lock check failed: {}", e)))?;

        let Some(lock) = response.as_array().and_then(|locks| locks.first()) else {
            // The holder released between our insert attempt and this check.
            return Ok(true);
        };

        let expired = lock
            .get("expires_at")
            .and_then(|v| v.as_str())
            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
            .is_some_and(|expires_at| expires_at.with_timezone(&Utc) < Utc::now());

        if expired {
            let _: Value = self.supabase.request(
                Method::DELETE,
                &format!("/rest/v1/scheduling_locks?lock_key=eq.{}", lock_key),
                None,
            ).await.map_err(|e| ScheduleError::DatabaseError(format!("Lock cleanup failed: {}", e)))?;

            debug!("Expired schedule lock cleaned up: {}", lock_key);
            return Ok(true);
        }

        Ok(false)
    }

    fn lock_key(doctor_id: Uuid) -> String {
        format!("doctor_{}", doctor_id)
    }
}
