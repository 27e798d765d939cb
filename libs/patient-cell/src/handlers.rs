use std::sync::Arc;
use axum::{
    extract::{Extension, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::identity::Identity;

use crate::models::{CreatePatientRequest, PatientError, UpdatePatientRequest};
use crate::services::PatientService;

fn map_patient_error(e: PatientError) -> AppError {
    match e {
        PatientError::NotFound => AppError::NotFound("Patient not found".to_string()),
        PatientError::ProfileAlreadyExists => {
            AppError::Conflict("Account already has a patient profile".to_string())
        }
        PatientError::Unauthorized => AppError::Forbidden("Access denied".to_string()),
        PatientError::ValidationError(msg) => AppError::ValidationError(msg),
        PatientError::DatabaseError(msg) => AppError::Database(msg),
    }
}

fn require_patient(identity: &Identity) -> Result<Uuid, AppError> {
    identity
        .patient
        .as_ref()
        .map(|p| p.id)
        .ok_or_else(|| AppError::Forbidden("Access denied".to_string()))
}

#[axum::debug_handler]
pub async fn create_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);

    let patient = service
        .create_patient(&user.id, request, auth.token())
        .await
        .map_err(map_patient_error)?;

    Ok(Json(json!(patient)))
}

/// Fetch the caller's own patient profile.
#[axum::debug_handler]
pub async fn get_own_profile(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_patient(&identity)?;
    let service = PatientService::new(&config);

    let patient = service
        .get_patient(patient_id, auth.token())
        .await
        .map_err(map_patient_error)?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_patient(&identity)?;
    let service = PatientService::new(&config);

    let patient = service
        .update_patient(patient_id, request, auth.token())
        .await
        .map_err(map_patient_error)?;

    Ok(Json(json!(patient)))
}
