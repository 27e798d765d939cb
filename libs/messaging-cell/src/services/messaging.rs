use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::identity::Identity;
use plan_cell::services::PlanService;
use plan_cell::models::{PlanError, TherapyPlan};

use crate::models::{fold_threads, Message, MessageThread, MessagingError};

pub struct MessagingService {
    supabase: SupabaseClient,
    plan_service: PlanService,
}

impl MessagingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            plan_service: PlanService::new(config),
        }
    }

    /// Send a message inside a plan. The sender must be one of the plan's
    /// two parties; the recipient is always the opposite party's account.
    pub async fn send_message(
        &self,
        identity: &Identity,
        plan_id: Uuid,
        body: String,
        auth_token: &str,
    ) -> Result<Message, MessagingError> {
        if body.trim().is_empty() {
            return Err(MessagingError::ValidationError(
                "Message body must not be empty".to_string(),
            ));
        }

        let plan = self.load_plan(plan_id, auth_token).await?;

        let sender_is_provider = identity
            .provider
            .as_ref()
            .map(|p| plan.is_provider(p.id))
            .unwrap_or(false);
        let sender_is_patient = identity
            .patient
            .as_ref()
            .map(|p| plan.is_patient(p.id))
            .unwrap_or(false);

        if !(sender_is_provider || sender_is_patient) {
            return Err(MessagingError::NotPartyToPlan);
        }

        let recipient_account_id = if sender_is_provider {
            self.account_for_patient(plan.patient_id, auth_token).await?
        } else {
            self.account_for_provider(plan.provider_id, auth_token).await?
        };

        let message_data = json!({
            "therapy_plan_id": plan_id,
            "sender_account_id": identity.account_id,
            "recipient_account_id": recipient_account_id,
            "body": body,
            "is_read": false,
            "created_at": chrono::Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/messages",
                Some(auth_token),
                Some(message_data),
                Some(headers),
            )
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| MessagingError::DatabaseError("Failed to send message".to_string()))?;

        let message: Message = serde_json::from_value(row)
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;
        info!("Message {} sent on plan {}", message.id, plan_id);

        Ok(message)
    }

    /// The conversation inside one plan, oldest first. Only parties may read.
    pub async fn plan_messages(
        &self,
        identity: &Identity,
        plan_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Message>, MessagingError> {
        let plan = self.load_plan(plan_id, auth_token).await?;

        let is_party = identity
            .provider
            .as_ref()
            .map(|p| plan.is_provider(p.id))
            .unwrap_or(false)
            || identity
                .patient
                .as_ref()
                .map(|p| plan.is_patient(p.id))
                .unwrap_or(false);
        if !is_party {
            return Err(MessagingError::NotPartyToPlan);
        }

        let path = format!(
            "/rest/v1/messages?therapy_plan_id=eq.{}&order=created_at.asc",
            plan_id
        );
        self.fetch_messages(&path, auth_token).await
    }

    /// Every message the account has sent or received, newest first.
    pub async fn user_messages(
        &self,
        account_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Message>, MessagingError> {
        let account = urlencoding::encode(account_id);
        let path = format!(
            "/rest/v1/messages?or=(sender_account_id.eq.{a},recipient_account_id.eq.{a})&order=created_at.desc",
            a = account
        );
        self.fetch_messages(&path, auth_token).await
    }

    /// Unread messages addressed to the account.
    pub async fn unread_count(
        &self,
        account_id: &str,
        auth_token: &str,
    ) -> Result<usize, MessagingError> {
        let path = format!(
            "/rest/v1/messages?recipient_account_id=eq.{}&is_read=eq.false&select=id",
            urlencoding::encode(account_id)
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        Ok(rows.len())
    }

    /// Thread overview: one entry per plan, most recent message first, with
    /// the viewer's unread inbox flipped to read as a side effect.
    ///
    /// The batch update deliberately has no compare-and-swap; two concurrent
    /// viewers both write `is_read = true`, which is idempotent in the final
    /// state.
    pub async fn view_threads(
        &self,
        account_id: &str,
        auth_token: &str,
    ) -> Result<Vec<MessageThread>, MessagingError> {
        let messages = self.user_messages(account_id, auth_token).await?;
        let threads = fold_threads(messages);

        self.mark_all_read(account_id, auth_token).await?;

        Ok(threads)
    }

    /// Flip every unread received message to read in one batch write.
    pub async fn mark_all_read(
        &self,
        account_id: &str,
        auth_token: &str,
    ) -> Result<(), MessagingError> {
        let path = format!(
            "/rest/v1/messages?recipient_account_id=eq.{}&is_read=eq.false",
            urlencoding::encode(account_id)
        );
        self.supabase
            .request_no_content(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "is_read": true })),
            )
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        debug!("Marked unread messages as read for account {}", account_id);
        Ok(())
    }

    async fn load_plan(&self, plan_id: Uuid, auth_token: &str) -> Result<TherapyPlan, MessagingError> {
        self.plan_service
            .get_plan(plan_id, auth_token)
            .await
            .map_err(|e| match e {
                PlanError::PlanNotFound => MessagingError::PlanNotFound,
                other => MessagingError::DatabaseError(other.to_string()),
            })
    }

    async fn fetch_messages(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Message>, MessagingError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Message>, _>>()
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))
    }

    async fn account_for_provider(
        &self,
        provider_id: Uuid,
        auth_token: &str,
    ) -> Result<String, MessagingError> {
        self.account_for("providers", provider_id, auth_token).await
    }

    async fn account_for_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<String, MessagingError> {
        self.account_for("patients", patient_id, auth_token).await
    }

    async fn account_for(
        &self,
        table: &str,
        profile_id: Uuid,
        auth_token: &str,
    ) -> Result<String, MessagingError> {
        let path = format!("/rest/v1/{}?id=eq.{}&select=account_id", table, profile_id);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        rows.first()
            .and_then(|row| row["account_id"].as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| MessagingError::DatabaseError("Plan party has no account".to_string()))
    }
}
