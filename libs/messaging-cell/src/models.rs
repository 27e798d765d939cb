use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message exchanged inside a therapy plan. Sender and recipient are
/// always the plan's two party accounts; delivery is by polling, not push.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub therapy_plan_id: Uuid,
    pub sender_account_id: String,
    pub recipient_account_id: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub body: String,
}

/// One conversation entry per therapy plan, carrying the most recent
/// message in that plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageThread {
    pub therapy_plan_id: Uuid,
    pub latest: Message,
}

/// Fold a created_at-descending message list into one thread per plan.
/// First seen wins, which on a descending list is the most recent message.
pub fn fold_threads(messages: Vec<Message>) -> Vec<MessageThread> {
    let mut seen = std::collections::HashSet::new();
    messages
        .into_iter()
        .filter(|m| seen.insert(m.therapy_plan_id))
        .map(|m| MessageThread {
            therapy_plan_id: m.therapy_plan_id,
            latest: m,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum MessagingError {
    #[error("Therapy plan not found")]
    PlanNotFound,

    #[error("Sender is not a party to this therapy plan")]
    NotPartyToPlan,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
