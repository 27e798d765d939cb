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

use crate::models::{MessagingError, SendMessageRequest};
use crate::services::MessagingService;

fn map_messaging_error(e: MessagingError) -> AppError {
    match e {
        MessagingError::PlanNotFound => AppError::NotFound("Therapy plan not found".to_string()),
        // Blanket refusal: do not reveal whether the plan exists or who its
        // parties are.
        MessagingError::NotPartyToPlan => AppError::Forbidden("Access denied".to_string()),
        MessagingError::ValidationError(msg) => AppError::ValidationError(msg),
        MessagingError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn send_message(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
    Path(plan_id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<Value>, AppError> {
    let service = MessagingService::new(&config);

    let message = service
        .send_message(&identity, plan_id, request.body, auth.token())
        .await
        .map_err(map_messaging_error)?;

    Ok(Json(json!(message)))
}

#[axum::debug_handler]
pub async fn get_plan_messages(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = MessagingService::new(&config);

    let messages = service
        .plan_messages(&identity, plan_id, auth.token())
        .await
        .map_err(map_messaging_error)?;

    Ok(Json(json!({
        "messages": messages,
        "total": messages.len()
    })))
}

/// Thread overview for the caller. Viewing marks their unread inbox read.
#[axum::debug_handler]
pub async fn view_threads(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    let service = MessagingService::new(&config);

    let threads = service
        .view_threads(&identity.account_id, auth.token())
        .await
        .map_err(map_messaging_error)?;

    Ok(Json(json!({
        "threads": threads,
        "total": threads.len()
    })))
}
