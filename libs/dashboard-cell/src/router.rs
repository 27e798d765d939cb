use std::sync::Arc;
use axum::{middleware, routing::get, Router};
use shared_config::AppConfig;
use shared_utils::extractor::{auth_middleware, identity_middleware};

use crate::handlers::*;

pub fn dashboard_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/provider", get(provider_dashboard))
        .route("/patient", get(patient_dashboard))
        .layer(middleware::from_fn_with_state(config.clone(), identity_middleware))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
