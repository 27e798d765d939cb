use std::sync::Arc;
use axum::{middleware, routing::{delete, get, post, put}, Router};
use shared_config::AppConfig;
use shared_utils::extractor::{auth_middleware, identity_middleware};

use crate::handlers::*;

pub fn plan_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/types", get(list_plan_types))
        .route("/types/{id}", delete(delete_plan_type))
        .route("/types/{id}/providers", get(get_plan_type_providers))
        .route("/types/{id}/support", post(support_plan_type))
        .route("/", post(create_plan))
        .route("/{id}", get(get_plan))
        .route("/{id}/status", put(update_plan_status))
        .layer(middleware::from_fn_with_state(config.clone(), identity_middleware))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
