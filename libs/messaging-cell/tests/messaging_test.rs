use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use messaging_cell::models::MessagingError;
use messaging_cell::services::MessagingService;
use shared_config::AppConfig;
use shared_models::identity::{Identity, PatientRef, ProviderRef};
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn config_for(mock_server: &MockServer) -> AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();
    config
}

fn patient_identity(account_id: &str, patient_id: Uuid) -> Identity {
    Identity {
        account_id: account_id.to_string(),
        provider: None,
        patient: Some(PatientRef {
            id: patient_id,
            account_id: account_id.to_string(),
            first_name: "Rowan".to_string(),
            last_name: "Deane".to_string(),
        }),
    }
}

fn provider_identity(account_id: &str, provider_id: Uuid) -> Identity {
    Identity {
        account_id: account_id.to_string(),
        provider: Some(ProviderRef {
            id: provider_id,
            account_id: account_id.to_string(),
            first_name: "Asha".to_string(),
            last_name: "Bell".to_string(),
        }),
        patient: None,
    }
}

struct PlanIds {
    plan_id: Uuid,
    provider_id: Uuid,
    patient_id: Uuid,
}

async fn mount_plan(mock_server: &MockServer) -> PlanIds {
    let ids = PlanIds {
        plan_id: Uuid::new_v4(),
        provider_id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
    };

    Mock::given(method("GET"))
        .and(path("/rest/v1/therapy_plans"))
        .and(query_param("id", format!("eq.{}", ids.plan_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::therapy_plan_response(
                &ids.plan_id.to_string(),
                &ids.patient_id.to_string(),
                &ids.provider_id.to_string(),
                &Uuid::new_v4().to_string(),
                "active",
            )
        ])))
        .mount(mock_server)
        .await;

    ids
}

#[tokio::test]
async fn patient_message_goes_to_the_provider_account() {
    let mock_server = MockServer::start().await;
    let ids = mount_plan(&mock_server).await;

    // Opposite party lookup: provider profile -> account
    Mock::given(method("GET"))
        .and(path("/rest/v1/providers"))
        .and(query_param("id", format!("eq.{}", ids.provider_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "account_id": "provider-account" }
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/messages"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::message_response(
                &Uuid::new_v4().to_string(),
                &ids.plan_id.to_string(),
                "patient-account",
                "provider-account",
                "2024-06-01T10:00:00Z",
            )
        ])))
        .mount(&mock_server)
        .await;

    let service = MessagingService::new(&config_for(&mock_server));
    let identity = patient_identity("patient-account", ids.patient_id);

    let message = service
        .send_message(&identity, ids.plan_id, "See you on Monday".to_string(), "token")
        .await
        .unwrap();

    assert_eq!(message.sender_account_id, "patient-account");
    assert_eq!(message.recipient_account_id, "provider-account");
    assert!(!message.is_read);
}

#[tokio::test]
async fn third_party_cannot_message_inside_a_plan() {
    let mock_server = MockServer::start().await;
    let ids = mount_plan(&mock_server).await;

    let service = MessagingService::new(&config_for(&mock_server));

    // A patient profile that is not the plan's patient
    let outsider = patient_identity("other-account", Uuid::new_v4());
    let result = service
        .send_message(&outsider, ids.plan_id, "hello".to_string(), "token")
        .await;
    assert!(matches!(result, Err(MessagingError::NotPartyToPlan)));

    // A provider profile that is not the plan's provider
    let outsider = provider_identity("other-provider", Uuid::new_v4());
    let result = service
        .send_message(&outsider, ids.plan_id, "hello".to_string(), "token")
        .await;
    assert!(matches!(result, Err(MessagingError::NotPartyToPlan)));
}

#[tokio::test]
async fn empty_message_bodies_are_rejected() {
    let mock_server = MockServer::start().await;
    let ids = mount_plan(&mock_server).await;

    let service = MessagingService::new(&config_for(&mock_server));
    let identity = patient_identity("patient-account", ids.patient_id);

    let result = service
        .send_message(&identity, ids.plan_id, "   ".to_string(), "token")
        .await;

    assert!(matches!(result, Err(MessagingError::ValidationError(_))));
}

#[tokio::test]
async fn both_parties_see_the_plan_conversation_oldest_first() {
    let mock_server = MockServer::start().await;
    let ids = mount_plan(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/messages"))
        .and(query_param("therapy_plan_id", format!("eq.{}", ids.plan_id)))
        .and(query_param("order", "created_at.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::message_response(
                &Uuid::new_v4().to_string(),
                &ids.plan_id.to_string(),
                "patient-account",
                "provider-account",
                "2024-06-01T10:00:00Z",
            ),
            MockSupabaseResponses::message_response(
                &Uuid::new_v4().to_string(),
                &ids.plan_id.to_string(),
                "provider-account",
                "patient-account",
                "2024-06-01T11:00:00Z",
            ),
        ])))
        .mount(&mock_server)
        .await;

    let service = MessagingService::new(&config_for(&mock_server));

    let as_patient = patient_identity("patient-account", ids.patient_id);
    let messages = service
        .plan_messages(&as_patient, ids.plan_id, "token")
        .await
        .unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].created_at <= messages[1].created_at);

    let as_provider = provider_identity("provider-account", ids.provider_id);
    let messages = service
        .plan_messages(&as_provider, ids.plan_id, "token")
        .await
        .unwrap();
    assert_eq!(messages.len(), 2);
}

#[tokio::test]
async fn viewing_threads_folds_per_plan_and_marks_inbox_read() {
    let mock_server = MockServer::start().await;

    let plan_a = Uuid::new_v4();
    let plan_b = Uuid::new_v4();
    let newest_in_a = Uuid::new_v4();

    // Descending created_at, two plans, three messages
    Mock::given(method("GET"))
        .and(path("/rest/v1/messages"))
        .and(query_param("order", "created_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::message_response(
                &newest_in_a.to_string(),
                &plan_a.to_string(),
                "provider-account",
                "viewer-account",
                "2024-06-03T12:00:00Z",
            ),
            MockSupabaseResponses::message_response(
                &Uuid::new_v4().to_string(),
                &plan_b.to_string(),
                "viewer-account",
                "provider-account",
                "2024-06-02T12:00:00Z",
            ),
            MockSupabaseResponses::message_response(
                &Uuid::new_v4().to_string(),
                &plan_a.to_string(),
                "viewer-account",
                "provider-account",
                "2024-06-01T12:00:00Z",
            ),
        ])))
        .mount(&mock_server)
        .await;

    // The at-most-once "viewed" transition: one batch write, no read-back
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/messages"))
        .and(query_param("recipient_account_id", "eq.viewer-account"))
        .and(query_param("is_read", "eq.false"))
        .and(body_json(json!({ "is_read": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = MessagingService::new(&config_for(&mock_server));
    let threads = service.view_threads("viewer-account", "token").await.unwrap();

    assert_eq!(threads.len(), 2);
    assert_eq!(threads[0].therapy_plan_id, plan_a);
    assert_eq!(threads[0].latest.id, newest_in_a);
    assert_eq!(threads[1].therapy_plan_id, plan_b);
}

#[tokio::test]
async fn unread_count_only_counts_unread_received_messages() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/messages"))
        .and(query_param("recipient_account_id", "eq.viewer-account"))
        .and(query_param("is_read", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": Uuid::new_v4() },
            { "id": Uuid::new_v4() },
            { "id": Uuid::new_v4() },
        ])))
        .mount(&mock_server)
        .await;

    let service = MessagingService::new(&config_for(&mock_server));
    let count = service.unread_count("viewer-account", "token").await.unwrap();

    assert_eq!(count, 3);
}
