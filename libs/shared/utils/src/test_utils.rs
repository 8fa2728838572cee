use std::sync::Arc;
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// Canned record-store rows for wiremock-backed integration tests.
pub struct MockStoreResponses;

impl MockStoreResponses {
    pub fn doctor_response(doctor_id: &str, name: &str, start: &str, end: &str) -> Value {
        json!({
            "id": doctor_id,
            "name": name,
            "specialization": "Obstetrics",
            "working_hours": {
                "start": start,
                "end": end
            },
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_response(
        doctor_id: &str,
        start_time: &str,
        duration_minutes: i32,
    ) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "doctor_id": doctor_id,
            "start_time": start_time,
            "duration_minutes": duration_minutes,
            "appointment_type": "Routine Check-Up",
            "patient_name": "Test Patient",
            "notes": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        })
    }

    pub fn error_response(message: &str) -> Value {
        json!({
            "error": {
                "message": message
            }
        })
    }
}
