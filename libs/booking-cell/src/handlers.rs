use std::sync::Arc;
use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_models::identity::Identity;

use crate::models::{BookSessionRequest, BookingError, UpdateSessionRequest};
use crate::services::SessionBookingService;

fn map_booking_error(e: BookingError) -> AppError {
    match e {
        BookingError::PlanNotFound => AppError::NotFound("Therapy plan not found".to_string()),
        BookingError::SessionNotFound => AppError::NotFound("Session not found".to_string()),
        BookingError::PlanNotActive => {
            AppError::State("Sessions can only be booked on an active plan".to_string())
        }
        BookingError::PastDateRejected => {
            AppError::ValidationError("Sessions cannot be booked in the past".to_string())
        }
        BookingError::SlotUnavailable => {
            AppError::Conflict("Requested slot is not available".to_string())
        }
        BookingError::InvalidTimeRange(msg) => AppError::ValidationError(msg),
        BookingError::InvalidStatusTransition(status) => {
            AppError::State(format!("Session cannot be modified in status {}", status))
        }
        BookingError::Unauthorized => AppError::Forbidden("Access denied".to_string()),
        BookingError::ValidationError(msg) => AppError::ValidationError(msg),
        BookingError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn book_session(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<BookSessionRequest>,
) -> Result<Json<Value>, AppError> {
    let patient = identity
        .patient
        .as_ref()
        .ok_or_else(|| AppError::Forbidden("Access denied".to_string()))?;

    let service = SessionBookingService::new(&config);
    let session = service
        .book_session(patient.id, request, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!(session)))
}

#[axum::debug_handler]
pub async fn get_session(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = SessionBookingService::new(&config);

    let session = service
        .get_session(session_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    let is_party = identity.provider.as_ref().map(|p| p.id == session.provider_id).unwrap_or(false)
        || identity.patient.as_ref().map(|p| p.id == session.patient_id).unwrap_or(false);
    if !is_party {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    Ok(Json(json!(session)))
}

#[axum::debug_handler]
pub async fn update_session(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<UpdateSessionRequest>,
) -> Result<Json<Value>, AppError> {
    let provider = identity
        .provider
        .as_ref()
        .ok_or_else(|| AppError::Forbidden("Access denied".to_string()))?;

    let service = SessionBookingService::new(&config);
    let session = service
        .update_session(provider.id, session_id, request, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!(session)))
}

#[axum::debug_handler]
pub async fn cancel_session(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let patient = identity
        .patient
        .as_ref()
        .ok_or_else(|| AppError::Forbidden("Access denied".to_string()))?;

    let service = SessionBookingService::new(&config);
    let session = service
        .cancel_own_session(patient.id, session_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!(session)))
}
