use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{CreateDoctorRequest, Doctor, DoctorError};

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_doctors(&self) -> Result<Vec<Doctor>, DoctorError> {
        debug!("Fetching all doctors");

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            "/rest/v1/doctors?order=name.asc",
            None,
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let doctors: Vec<Doctor> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Doctor>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctors: {}", e)))?;

        Ok(doctors)
    }

    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            None,
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DoctorError::NotFound);
        }

        let doctor: Doctor = serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctor: {}", e)))?;

        Ok(doctor)
    }

    /// Create a doctor record. Working hours arrive already validated by the
    /// typed `WorkingHours` boundary; only the name needs checking here.
    pub async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<Doctor, DoctorError> {
        debug!("Creating doctor: {}", request.name);

        let name = request.name.trim();
        if name.is_empty() {
            return Err(DoctorError::ValidationError("Doctor name is required".to_string()));
        }

        let doctor_data = json!({
            "name": name,
            "specialization": request.specialization,
            "working_hours": request.working_hours,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/doctors",
            Some(doctor_data),
            Some(headers),
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DoctorError::DatabaseError("Failed to create doctor".to_string()));
        }

        let doctor: Doctor = serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctor: {}", e)))?;

        debug!("Doctor created with ID: {}", doctor.id);
        Ok(doctor)
    }
}
