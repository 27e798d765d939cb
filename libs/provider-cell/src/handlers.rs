use std::sync::Arc;
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::{NaiveDate, NaiveTime};
use headers::{Authorization, authorization::Bearer};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::identity::Identity;

use crate::models::{CreateAvailabilityRequest, CreateProviderRequest, ProviderError, ProviderSearchQuery, UpdateProviderRequest};
use crate::services::{AvailabilityService, ProviderService};

fn map_provider_error(e: ProviderError) -> AppError {
    match e {
        ProviderError::NotFound => AppError::NotFound("Provider not found".to_string()),
        ProviderError::AvailabilityNotFound => {
            AppError::NotFound("Availability window not found".to_string())
        }
        ProviderError::ProfileAlreadyExists => {
            AppError::Conflict("Account already has a provider profile".to_string())
        }
        ProviderError::InvalidTimeRange(msg) => AppError::ValidationError(msg),
        ProviderError::Unauthorized => AppError::Forbidden("Access denied".to_string()),
        ProviderError::ValidationError(msg) => AppError::ValidationError(msg),
        ProviderError::DatabaseError(msg) => AppError::Database(msg),
    }
}

/// The acting provider profile from the resolved identity, or a blanket
/// refusal when the account has none.
fn require_provider(identity: &Identity) -> Result<Uuid, AppError> {
    identity
        .provider
        .as_ref()
        .map(|p| p.id)
        .ok_or_else(|| AppError::Forbidden("Access denied".to_string()))
}

#[axum::debug_handler]
pub async fn create_provider(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateProviderRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ProviderService::new(&config);

    let provider = service
        .create_provider(&user.id, request, auth.token())
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!(provider)))
}

#[axum::debug_handler]
pub async fn get_provider(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = ProviderService::new(&config);

    let provider = service
        .get_provider(provider_id, auth.token())
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!(provider)))
}

#[axum::debug_handler]
pub async fn update_provider(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<UpdateProviderRequest>,
) -> Result<Json<Value>, AppError> {
    let provider_id = require_provider(&identity)?;
    let service = ProviderService::new(&config);

    let provider = service
        .update_provider(provider_id, request, auth.token())
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!(provider)))
}

#[axum::debug_handler]
pub async fn search_providers(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<ProviderSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let service = ProviderService::new(&config);

    let providers = service
        .search_providers(query, auth.token())
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!({
        "providers": providers,
        "total": providers.len()
    })))
}

#[axum::debug_handler]
pub async fn get_weekly_schedule(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&config);

    let schedule = service
        .weekly_schedule(provider_id, auth.token())
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!({ "schedule": schedule })))
}

#[axum::debug_handler]
pub async fn create_availability(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<CreateAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let provider_id = require_provider(&identity)?;
    let service = AvailabilityService::new(&config);

    let availability = service
        .create_availability(provider_id, request, auth.token())
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!(availability)))
}

#[axum::debug_handler]
pub async fn delete_availability(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
    Path(availability_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let provider_id = require_provider(&identity)?;
    let service = AvailabilityService::new(&config);

    service
        .delete_availability(provider_id, availability_id, auth.token())
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!({ "deleted": true })))
}

#[derive(Debug, Deserialize)]
pub struct FreeSlotQuery {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Read-only probe of the availability engine: is the given range bookable?
#[axum::debug_handler]
pub async fn check_slot_free(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(provider_id): Path<Uuid>,
    Query(query): Query<FreeSlotQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&config);

    let free = service
        .is_free(provider_id, query.date, query.start, query.end, auth.token())
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!({
        "provider_id": provider_id,
        "date": query.date,
        "free": free
    })))
}
