use chrono::Utc;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use booking_cell::models::Session;
use messaging_cell::services::MessagingService;
use plan_cell::models::TherapyPlan;

use crate::models::{
    DashboardError, PartyRole, PatientDashboard, ProviderDashboard, DEFAULT_PAST_SESSIONS_LIMIT,
};

/// Read-side aggregation. Every view is computed fresh from the store; an
/// empty result is a valid answer, never an error. The only mutation in
/// this cell is the mark-as-read side effect delegated to messaging.
pub struct DashboardService {
    supabase: SupabaseClient,
    messaging_service: MessagingService,
}

impl DashboardService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            messaging_service: MessagingService::new(config),
        }
    }

    pub async fn provider_dashboard(
        &self,
        provider_id: Uuid,
        account_id: &str,
        auth_token: &str,
    ) -> Result<ProviderDashboard, DashboardError> {
        debug!("Building provider dashboard for {}", provider_id);

        let active_plans = self
            .active_plans(PartyRole::Provider, provider_id, auth_token)
            .await?;
        let upcoming_sessions = self
            .upcoming_sessions(PartyRole::Provider, provider_id, auth_token)
            .await?;
        let today_sessions = self.today_sessions(provider_id, auth_token).await?;
        let unread_messages = self
            .messaging_service
            .unread_count(account_id, auth_token)
            .await
            .map_err(|e| DashboardError::DatabaseError(e.to_string()))?;

        Ok(ProviderDashboard {
            active_plans,
            upcoming_sessions,
            today_sessions,
            unread_messages,
        })
    }

    pub async fn patient_dashboard(
        &self,
        patient_id: Uuid,
        account_id: &str,
        past_limit: Option<i32>,
        auth_token: &str,
    ) -> Result<PatientDashboard, DashboardError> {
        debug!("Building patient dashboard for {}", patient_id);

        let active_plans = self
            .active_plans(PartyRole::Patient, patient_id, auth_token)
            .await?;
        let all_plans = self.all_plans(patient_id, auth_token).await?;
        let upcoming_sessions = self
            .upcoming_sessions(PartyRole::Patient, patient_id, auth_token)
            .await?;
        let past_sessions = self
            .past_sessions(
                PartyRole::Patient,
                patient_id,
                past_limit.unwrap_or(DEFAULT_PAST_SESSIONS_LIMIT),
                auth_token,
            )
            .await?;
        let unread_messages = self
            .messaging_service
            .unread_count(account_id, auth_token)
            .await
            .map_err(|e| DashboardError::DatabaseError(e.to_string()))?;

        Ok(PatientDashboard {
            active_plans,
            all_plans,
            upcoming_sessions,
            past_sessions,
            unread_messages,
        })
    }

    /// Plans with status=active for either party.
    pub async fn active_plans(
        &self,
        role: PartyRole,
        party_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<TherapyPlan>, DashboardError> {
        let path = format!(
            "/rest/v1/therapy_plans?{}=eq.{}&status=eq.active&order=created_at.desc",
            role.fk_column(),
            party_id
        );
        self.fetch_plans(&path, auth_token).await
    }

    /// A patient's full plan history, newest first.
    pub async fn all_plans(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<TherapyPlan>, DashboardError> {
        let path = format!(
            "/rest/v1/therapy_plans?patient_id=eq.{}&order=created_at.desc",
            patient_id
        );
        self.fetch_plans(&path, auth_token).await
    }

    /// Scheduled sessions from today onwards, soonest first.
    pub async fn upcoming_sessions(
        &self,
        role: PartyRole,
        party_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Session>, DashboardError> {
        let today = Utc::now().date_naive().format("%Y-%m-%d");
        let path = format!(
            "/rest/v1/sessions?{}=eq.{}&session_date=gte.{}&status=eq.scheduled&order=session_date.asc,session_time.asc",
            role.fk_column(),
            party_id,
            today
        );
        self.fetch_sessions(&path, auth_token).await
    }

    /// Concluded sessions (completed, cancelled or no-show), newest first,
    /// capped to `limit`.
    pub async fn past_sessions(
        &self,
        role: PartyRole,
        party_id: Uuid,
        limit: i32,
        auth_token: &str,
    ) -> Result<Vec<Session>, DashboardError> {
        let path = format!(
            "/rest/v1/sessions?{}=eq.{}&status=in.(completed,cancelled,no-show)&order=session_date.desc,session_time.desc&limit={}",
            role.fk_column(),
            party_id,
            limit
        );
        self.fetch_sessions(&path, auth_token).await
    }

    /// A provider's scheduled sessions for today, in time order.
    pub async fn today_sessions(
        &self,
        provider_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Session>, DashboardError> {
        let today = Utc::now().date_naive().format("%Y-%m-%d");
        let path = format!(
            "/rest/v1/sessions?provider_id=eq.{}&session_date=eq.{}&status=eq.scheduled&order=session_time.asc",
            provider_id, today
        );
        self.fetch_sessions(&path, auth_token).await
    }

    async fn fetch_plans(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<TherapyPlan>, DashboardError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| DashboardError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<TherapyPlan>, _>>()
            .map_err(|e| DashboardError::DatabaseError(e.to_string()))
    }

    async fn fetch_sessions(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Session>, DashboardError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| DashboardError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Session>, _>>()
            .map_err(|e| DashboardError::DatabaseError(e.to_string()))
    }
}
