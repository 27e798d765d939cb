use std::sync::Arc;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use provider_cell::router::provider_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn create_test_app(config: AppConfig) -> Router {
    provider_routes(Arc::new(config))
}

async fn mount_identity_mocks(mock_server: &MockServer, account_id: &str, provider_id: Option<Uuid>) {
    let provider_rows = match provider_id {
        Some(id) => json!([MockSupabaseResponses::provider_response(
            &id.to_string(),
            account_id,
            "Deane"
        )]),
        None => json!([]),
    };

    Mock::given(method("GET"))
        .and(path("/rest/v1/providers"))
        .and(query_param("account_id", format!("eq.{}", account_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(provider_rows))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("account_id", format!("eq.{}", account_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn requests_without_a_token_are_unauthorized() {
    let config = TestConfig::default().to_app_config();
    let app = create_test_app(config);

    let request = Request::builder()
        .method("POST")
        .uri("/availability")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn provider_can_add_an_availability_window() {
    let mock_server = MockServer::start().await;

    let user = TestUser::provider("asha@example.com");
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();

    let provider_id = Uuid::new_v4();
    mount_identity_mocks(&mock_server, &user.id, Some(provider_id)).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/availabilities"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::availability_response(
                &Uuid::new_v4().to_string(),
                &provider_id.to_string(),
                "monday",
                "09:00:00",
                "12:00:00",
            )
        ])))
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let app = create_test_app(config);

    let request = Request::builder()
        .method("POST")
        .uri("/availability")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(
            json!({
                "day_of_week": "monday",
                "start_time": "09:00:00",
                "end_time": "12:00:00"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn account_without_provider_profile_is_refused() {
    let mock_server = MockServer::start().await;

    let user = TestUser::patient("rowan@example.com");
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();

    mount_identity_mocks(&mock_server, &user.id, None).await;

    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let app = create_test_app(config);

    let request = Request::builder()
        .method("POST")
        .uri("/availability")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(
            json!({
                "day_of_week": "monday",
                "start_time": "09:00:00",
                "end_time": "12:00:00"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
