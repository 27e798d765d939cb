use std::sync::Arc;
use axum::{middleware, routing::{get, post}, Router};
use shared_config::AppConfig;
use shared_utils::extractor::{auth_middleware, identity_middleware};

use crate::handlers::*;

pub fn message_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/threads", get(view_threads))
        .route("/plan/{plan_id}", get(get_plan_messages))
        .route("/plan/{plan_id}", post(send_message))
        .layer(middleware::from_fn_with_state(config.clone(), identity_middleware))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
