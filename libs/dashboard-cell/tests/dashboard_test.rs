use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use booking_cell::models::SessionStatus;
use dashboard_cell::models::PartyRole;
use dashboard_cell::services::DashboardService;
use shared_config::AppConfig;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn config_for(mock_server: &MockServer) -> AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();
    config
}

#[tokio::test]
async fn provider_dashboard_gathers_plans_sessions_and_unread_count() {
    let mock_server = MockServer::start().await;
    let provider_id = Uuid::new_v4();
    let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();

    // Active plans
    Mock::given(method("GET"))
        .and(path("/rest/v1/therapy_plans"))
        .and(query_param("provider_id", format!("eq.{}", provider_id)))
        .and(query_param("status", "eq.active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::therapy_plan_response(
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &provider_id.to_string(),
                &Uuid::new_v4().to_string(),
                "active",
            )
        ])))
        .mount(&mock_server)
        .await;

    // Upcoming sessions (from today on)
    Mock::given(method("GET"))
        .and(path("/rest/v1/sessions"))
        .and(query_param("session_date", format!("gte.{}", today)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::session_response(
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &provider_id.to_string(),
                &Uuid::new_v4().to_string(),
                &today,
                "10:00:00",
            )
        ])))
        .mount(&mock_server)
        .await;

    // Today's sessions
    Mock::given(method("GET"))
        .and(path("/rest/v1/sessions"))
        .and(query_param("session_date", format!("eq.{}", today)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::session_response(
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &provider_id.to_string(),
                &Uuid::new_v4().to_string(),
                &today,
                "09:00:00",
            )
        ])))
        .mount(&mock_server)
        .await;

    // Two unread messages
    Mock::given(method("GET"))
        .and(path("/rest/v1/messages"))
        .and(query_param("is_read", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": Uuid::new_v4() },
            { "id": Uuid::new_v4() },
        ])))
        .mount(&mock_server)
        .await;

    let service = DashboardService::new(&config_for(&mock_server));
    let dashboard = service
        .provider_dashboard(provider_id, "provider-account", "token")
        .await
        .unwrap();

    assert_eq!(dashboard.active_plans.len(), 1);
    assert_eq!(dashboard.upcoming_sessions.len(), 1);
    assert_eq!(dashboard.today_sessions.len(), 1);
    assert_eq!(dashboard.unread_messages, 2);
}

#[tokio::test]
async fn empty_store_yields_an_empty_dashboard_not_an_error() {
    let mock_server = MockServer::start().await;
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/therapy_plans"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = DashboardService::new(&config_for(&mock_server));
    let dashboard = service
        .patient_dashboard(patient_id, "patient-account", None, "token")
        .await
        .unwrap();

    assert!(dashboard.active_plans.is_empty());
    assert!(dashboard.all_plans.is_empty());
    assert!(dashboard.upcoming_sessions.is_empty());
    assert!(dashboard.past_sessions.is_empty());
    assert_eq!(dashboard.unread_messages, 0);
}

#[tokio::test]
async fn past_sessions_filter_terminal_statuses_and_respect_the_limit() {
    let mock_server = MockServer::start().await;
    let patient_id = Uuid::new_v4();

    let mut completed = MockSupabaseResponses::session_response(
        &Uuid::new_v4().to_string(),
        &Uuid::new_v4().to_string(),
        &Uuid::new_v4().to_string(),
        &patient_id.to_string(),
        "2024-06-03",
        "10:00:00",
    );
    completed["status"] = json!("completed");

    Mock::given(method("GET"))
        .and(path("/rest/v1/sessions"))
        .and(query_param("patient_id", format!("eq.{}", patient_id)))
        .and(query_param("status", "in.(completed,cancelled,no-show)"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([completed])))
        .mount(&mock_server)
        .await;

    let service = DashboardService::new(&config_for(&mock_server));
    let sessions = service
        .past_sessions(PartyRole::Patient, patient_id, 5, "token")
        .await
        .unwrap();

    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].status, SessionStatus::Completed);
}
