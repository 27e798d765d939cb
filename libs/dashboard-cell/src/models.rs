use serde::{Deserialize, Serialize};

use booking_cell::models::Session;
use plan_cell::models::TherapyPlan;

pub const DEFAULT_PAST_SESSIONS_LIMIT: i32 = 10;

/// Which side of a therapy plan a query is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyRole {
    Provider,
    Patient,
}

impl PartyRole {
    /// Column name carrying this party's profile id on plan/session rows.
    pub fn fk_column(&self) -> &'static str {
        match self {
            PartyRole::Provider => "provider_id",
            PartyRole::Patient => "patient_id",
        }
    }
}

/// Everything the provider home screen shows in one payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDashboard {
    pub active_plans: Vec<TherapyPlan>,
    pub upcoming_sessions: Vec<Session>,
    pub today_sessions: Vec<Session>,
    pub unread_messages: usize,
}

/// Everything the patient home screen shows in one payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDashboard {
    pub active_plans: Vec<TherapyPlan>,
    pub all_plans: Vec<TherapyPlan>,
    pub upcoming_sessions: Vec<Session>,
    pub past_sessions: Vec<Session>,
    pub unread_messages: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum DashboardError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}
