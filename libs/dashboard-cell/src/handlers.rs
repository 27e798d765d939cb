use std::sync::Arc;
use axum::{
    extract::{Extension, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_models::identity::Identity;

use crate::models::DashboardError;
use crate::services::DashboardService;

fn map_dashboard_error(e: DashboardError) -> AppError {
    match e {
        DashboardError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[derive(Debug, Deserialize)]
pub struct PastSessionsQuery {
    pub past_limit: Option<i32>,
}

#[axum::debug_handler]
pub async fn provider_dashboard(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, AppError> {
    let provider = identity
        .provider
        .as_ref()
        .ok_or_else(|| AppError::Forbidden("Access denied".to_string()))?;

    let service = DashboardService::new(&config);
    let dashboard = service
        .provider_dashboard(provider.id, &identity.account_id, auth.token())
        .await
        .map_err(map_dashboard_error)?;

    Ok(Json(json!(dashboard)))
}

#[axum::debug_handler]
pub async fn patient_dashboard(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<PastSessionsQuery>,
) -> Result<Json<Value>, AppError> {
    let patient = identity
        .patient
        .as_ref()
        .ok_or_else(|| AppError::Forbidden("Access denied".to_string()))?;

    let service = DashboardService::new(&config);
    let dashboard = service
        .patient_dashboard(patient.id, &identity.account_id, query.past_limit, auth.token())
        .await
        .map_err(map_dashboard_error)?;

    Ok(Json(json!(dashboard)))
}
