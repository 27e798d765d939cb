use std::sync::Arc;
use axum::{middleware, routing::{delete, get, post, put}, Router};
use shared_config::AppConfig;
use shared_utils::extractor::{auth_middleware, identity_middleware};

use crate::handlers::*;

pub fn provider_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(create_provider))
        .route("/", put(update_provider))
        .route("/search", get(search_providers))
        .route("/{id}", get(get_provider))
        .route("/{id}/schedule", get(get_weekly_schedule))
        .route("/{id}/free", get(check_slot_free))
        .route("/availability", post(create_availability))
        .route("/availability/{id}", delete(delete_availability))
        .layer(middleware::from_fn_with_state(config.clone(), identity_middleware))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
