use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::identity::Identity;

use crate::jwt::validate_token;

/// Authentication middleware: validates the bearer token and injects the
/// authenticated `User` into request extensions.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)?.to_string();

    let user = validate_token(&token, &config.supabase_jwt_secret)
        .map_err(AppError::Auth)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Identity middleware: resolves the request's role context exactly once.
///
/// Layered after `auth_middleware` on routes that branch on role. Handlers
/// read the `Identity` extension instead of re-querying provider/patient
/// existence at every call site.
pub async fn identity_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)?.to_string();

    let user = request
        .extensions()
        .get::<User>()
        .cloned()
        .ok_or_else(|| AppError::Auth("User not found in request extensions".to_string()))?;

    let supabase = SupabaseClient::new(&config);
    let identity = supabase
        .resolve_identity(&user.id, &token)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

fn bearer_token(request: &Request<Body>) -> Result<&str, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))
}

/// Extract the resolved identity from request extensions.
pub fn extract_identity<B>(request: &Request<B>) -> Result<Identity, AppError> {
    request
        .extensions()
        .get::<Identity>()
        .cloned()
        .ok_or_else(|| AppError::Auth("Identity not resolved for request".to_string()))
}
