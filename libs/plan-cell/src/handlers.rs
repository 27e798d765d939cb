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

use crate::models::{CreateTherapyPlanRequest, PlanError, UpdatePlanStatusRequest};
use crate::services::PlanService;

fn map_plan_error(e: PlanError) -> AppError {
    match e {
        PlanError::PlanTypeNotFound => AppError::NotFound("Plan type not found".to_string()),
        PlanError::PlanNotFound => AppError::NotFound("Therapy plan not found".to_string()),
        PlanError::PlanTypeInactive => {
            AppError::State("Plan type is not active".to_string())
        }
        PlanError::ProviderNotSupported => {
            AppError::ValidationError("Provider does not support this plan type".to_string())
        }
        PlanError::PlanTypeInUse => {
            AppError::Conflict("Plan type is referenced by existing therapy plans".to_string())
        }
        PlanError::Unauthorized => AppError::Forbidden("Access denied".to_string()),
        PlanError::ValidationError(msg) => AppError::ValidationError(msg),
        PlanError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn list_plan_types(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = PlanService::new(&config);

    let plan_types = service
        .list_plan_types(auth.token())
        .await
        .map_err(map_plan_error)?;

    Ok(Json(json!({
        "plan_types": plan_types,
        "total": plan_types.len()
    })))
}

#[axum::debug_handler]
pub async fn get_plan_type_providers(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(plan_type_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = PlanService::new(&config);

    let providers = service
        .providers_for_plan_type(plan_type_id, auth.token())
        .await
        .map_err(map_plan_error)?;

    Ok(Json(json!({ "provider_ids": providers })))
}

/// A provider opts in to offering a plan type.
#[axum::debug_handler]
pub async fn support_plan_type(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
    Path(plan_type_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let provider = identity
        .provider
        .as_ref()
        .ok_or_else(|| AppError::Forbidden("Access denied".to_string()))?;

    let service = PlanService::new(&config);
    service
        .add_supporting_provider(plan_type_id, provider.id, auth.token())
        .await
        .map_err(map_plan_error)?;

    Ok(Json(json!({ "supported": true })))
}

#[axum::debug_handler]
pub async fn delete_plan_type(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(plan_type_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = PlanService::new(&config);

    service
        .delete_plan_type(plan_type_id, auth.token())
        .await
        .map_err(map_plan_error)?;

    Ok(Json(json!({ "deleted": true })))
}

/// Patient starts a plan with a chosen provider and plan type.
#[axum::debug_handler]
pub async fn create_plan(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<CreateTherapyPlanRequest>,
) -> Result<Json<Value>, AppError> {
    let patient = identity
        .patient
        .as_ref()
        .ok_or_else(|| AppError::Forbidden("Access denied".to_string()))?;

    let service = PlanService::new(&config);
    let plan = service
        .create_plan(patient.id, request, auth.token())
        .await
        .map_err(map_plan_error)?;

    Ok(Json(json!(plan)))
}

#[axum::debug_handler]
pub async fn get_plan(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = PlanService::new(&config);

    let plan = service
        .get_plan(plan_id, auth.token())
        .await
        .map_err(map_plan_error)?;

    // Only the two parties may read a plan; refuse without disclosing it.
    let is_party = identity.provider.as_ref().map(|p| plan.is_provider(p.id)).unwrap_or(false)
        || identity.patient.as_ref().map(|p| plan.is_patient(p.id)).unwrap_or(false);
    if !is_party {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    Ok(Json(json!(plan)))
}

#[axum::debug_handler]
pub async fn update_plan_status(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
    Path(plan_id): Path<Uuid>,
    Json(request): Json<UpdatePlanStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let provider = identity
        .provider
        .as_ref()
        .ok_or_else(|| AppError::Forbidden("Access denied".to_string()))?;

    let service = PlanService::new(&config);
    let plan = service
        .update_plan_status(provider.id, plan_id, request.status, auth.token())
        .await
        .map_err(map_plan_error)?;

    Ok(Json(json!(plan)))
}
