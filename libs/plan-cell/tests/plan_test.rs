use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use plan_cell::models::{CreateTherapyPlanRequest, PlanError, PlanStatus};
use plan_cell::services::PlanService;
use shared_config::AppConfig;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn config_for(mock_server: &MockServer) -> AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();
    config
}

async fn mount_plan_type(mock_server: &MockServer, plan_type_id: Uuid, is_active: bool, base_cost: f64) {
    let mut row = MockSupabaseResponses::plan_type_response(
        &plan_type_id.to_string(),
        "Weekly CBT",
        base_cost,
    );
    row["is_active"] = json!(is_active);

    Mock::given(method("GET"))
        .and(path("/rest/v1/plan_types"))
        .and(query_param("id", format!("eq.{}", plan_type_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(mock_server)
        .await;
}

async fn mount_supporting_providers(mock_server: &MockServer, plan_type_id: Uuid, provider_ids: &[Uuid]) {
    let rows: Vec<_> = provider_ids
        .iter()
        .map(|id| json!({ "provider_id": id }))
        .collect();

    Mock::given(method("GET"))
        .and(path("/rest/v1/plan_type_providers"))
        .and(query_param("plan_type_id", format!("eq.{}", plan_type_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(rows)))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn plan_creation_copies_the_base_cost_and_starts_active() {
    let mock_server = MockServer::start().await;

    let patient_id = Uuid::new_v4();
    let provider_id = Uuid::new_v4();
    let plan_type_id = Uuid::new_v4();

    mount_plan_type(&mock_server, plan_type_id, true, 90.0).await;
    mount_supporting_providers(&mock_server, plan_type_id, &[provider_id]).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/therapy_plans"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::therapy_plan_response(
                &Uuid::new_v4().to_string(),
                &patient_id.to_string(),
                &provider_id.to_string(),
                &plan_type_id.to_string(),
                "active",
            )
        ])))
        .mount(&mock_server)
        .await;

    let service = PlanService::new(&config_for(&mock_server));
    let plan = service
        .create_plan(
            patient_id,
            CreateTherapyPlanRequest {
                provider_id,
                plan_type_id,
                start_date: None,
                notes: None,
            },
            "token",
        )
        .await
        .unwrap();

    assert_eq!(plan.status, PlanStatus::Active);
    assert_eq!(plan.cost, Some(90.0));
}

#[tokio::test]
async fn unsupported_provider_cannot_be_assigned() {
    let mock_server = MockServer::start().await;

    let plan_type_id = Uuid::new_v4();
    mount_plan_type(&mock_server, plan_type_id, true, 90.0).await;
    // Someone else supports it; the requested provider does not.
    mount_supporting_providers(&mock_server, plan_type_id, &[Uuid::new_v4()]).await;

    let service = PlanService::new(&config_for(&mock_server));
    let result = service
        .create_plan(
            Uuid::new_v4(),
            CreateTherapyPlanRequest {
                provider_id: Uuid::new_v4(),
                plan_type_id,
                start_date: None,
                notes: None,
            },
            "token",
        )
        .await;

    assert!(matches!(result, Err(PlanError::ProviderNotSupported)));
}

#[tokio::test]
async fn inactive_plan_types_cannot_be_subscribed() {
    let mock_server = MockServer::start().await;

    let plan_type_id = Uuid::new_v4();
    mount_plan_type(&mock_server, plan_type_id, false, 90.0).await;

    let service = PlanService::new(&config_for(&mock_server));
    let result = service
        .create_plan(
            Uuid::new_v4(),
            CreateTherapyPlanRequest {
                provider_id: Uuid::new_v4(),
                plan_type_id,
                start_date: None,
                notes: None,
            },
            "token",
        )
        .await;

    assert!(matches!(result, Err(PlanError::PlanTypeInactive)));
}

#[tokio::test]
async fn referenced_plan_types_are_protected_from_deletion() {
    let mock_server = MockServer::start().await;

    let plan_type_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/therapy_plans"))
        .and(query_param("plan_type_id", format!("eq.{}", plan_type_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": Uuid::new_v4() }
        ])))
        .mount(&mock_server)
        .await;

    let service = PlanService::new(&config_for(&mock_server));
    let result = service.delete_plan_type(plan_type_id, "token").await;

    assert!(matches!(result, Err(PlanError::PlanTypeInUse)));
}

#[tokio::test]
async fn plan_status_updates_are_owner_only() {
    let mock_server = MockServer::start().await;

    let plan_id = Uuid::new_v4();
    let owner = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/therapy_plans"))
        .and(query_param("id", format!("eq.{}", plan_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::therapy_plan_response(
                &plan_id.to_string(),
                &Uuid::new_v4().to_string(),
                &owner.to_string(),
                &Uuid::new_v4().to_string(),
                "active",
            )
        ])))
        .mount(&mock_server)
        .await;

    let service = PlanService::new(&config_for(&mock_server));
    let result = service
        .update_plan_status(Uuid::new_v4(), plan_id, PlanStatus::Paused, "token")
        .await;

    assert!(matches!(result, Err(PlanError::Unauthorized)));
}
