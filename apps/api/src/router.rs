use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use booking_cell::router::session_routes;
use dashboard_cell::router::dashboard_routes;
use messaging_cell::router::message_routes;
use patient_cell::router::patient_routes;
use plan_cell::router::plan_routes;
use provider_cell::router::provider_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "MindWell API is running!" }))
        .nest("/providers", provider_routes(state.clone()))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/plans", plan_routes(state.clone()))
        .nest("/sessions", session_routes(state.clone()))
        .nest("/messages", message_routes(state.clone()))
        .nest("/dashboard", dashboard_routes(state.clone()))
}
