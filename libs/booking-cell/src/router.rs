use std::sync::Arc;
use axum::{middleware, routing::{get, post, put}, Router};
use shared_config::AppConfig;
use shared_utils::extractor::{auth_middleware, identity_middleware};

use crate::handlers::*;

pub fn session_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(book_session))
        .route("/{id}", get(get_session))
        .route("/{id}", put(update_session))
        .route("/{id}/cancel", post(cancel_session))
        .layer(middleware::from_fn_with_state(config.clone(), identity_middleware))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
