use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{CreatePatientRequest, Patient, PatientError, UpdatePatientRequest};

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Create the patient profile for an account. One account maps to at
    /// most one patient.
    pub async fn create_patient(
        &self,
        account_id: &str,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Creating patient profile for account: {}", account_id);

        let existing_check_path = format!(
            "/rest/v1/patients?account_id=eq.{}",
            urlencoding::encode(account_id)
        );
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &existing_check_path, Some(auth_token), None)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        if !existing.is_empty() {
            return Err(PatientError::ProfileAlreadyExists);
        }

        let patient_data = json!({
            "account_id": account_id,
            "first_name": request.first_name,
            "last_name": request.last_name,
            "email": request.email,
            "dob": request.dob.map(|d| d.format("%Y-%m-%d").to_string()),
            "gender": request.gender,
            "address": request.address,
            "emergency_contact_name": request.emergency_contact_name,
            "emergency_contact_phone": request.emergency_contact_phone,
            "insurance_provider": request.insurance_provider,
            "insurance_id": request.insurance_id,
            "therapy_description": request.therapy_description,
            "created_at": chrono::Utc::now().to_rfc3339(),
            "updated_at": chrono::Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/patients",
                Some(auth_token),
                Some(patient_data),
                Some(headers),
            )
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| PatientError::DatabaseError("Failed to create patient profile".to_string()))?;

        let patient: Patient = serde_json::from_value(row)
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;
        debug!("Patient profile created with ID: {}", patient.id);

        Ok(patient)
    }

    pub async fn get_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Fetching patient profile: {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(PatientError::NotFound)?;
        serde_json::from_value(row).map_err(|e| PatientError::DatabaseError(e.to_string()))
    }

    pub async fn update_patient(
        &self,
        patient_id: Uuid,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Updating patient profile: {}", patient_id);

        let mut update_data = serde_json::Map::new();

        if let Some(first_name) = request.first_name {
            update_data.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = request.last_name {
            update_data.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(name) = request.emergency_contact_name {
            update_data.insert("emergency_contact_name".to_string(), json!(name));
        }
        if let Some(phone) = request.emergency_contact_phone {
            update_data.insert("emergency_contact_phone".to_string(), json!(phone));
        }
        if let Some(insurance_provider) = request.insurance_provider {
            update_data.insert("insurance_provider".to_string(), json!(insurance_provider));
        }
        if let Some(insurance_id) = request.insurance_id {
            update_data.insert("insurance_id".to_string(), json!(insurance_id));
        }
        if let Some(description) = request.therapy_description {
            update_data.insert("therapy_description".to_string(), json!(description));
        }

        update_data.insert("updated_at".to_string(), json!(chrono::Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(headers),
            )
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(PatientError::NotFound)?;
        serde_json::from_value(row).map_err(|e| PatientError::DatabaseError(e.to_string()))
    }
}
