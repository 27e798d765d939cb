use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const DEFAULT_SESSION_MINUTES: i32 = 60;

// ==============================================================================
// SESSION MODELS
// ==============================================================================

/// A single scheduled occurrence of care delivery under a therapy plan.
/// provider_id and patient_id are denormalized from the plan at booking so
/// conflict checks and dashboards never need a join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub therapy_plan_id: Uuid,
    pub provider_id: Uuid,
    pub patient_id: Uuid,
    pub session_date: NaiveDate,
    pub session_time: NaiveTime,
    pub duration_minutes: i32,
    pub status: SessionStatus,
    pub session_type: SessionType,
    pub notes: Option<String>,
    pub payment_status: PaymentStatus,
    pub follow_up_required: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn end_time(&self) -> NaiveTime {
        self.session_time + chrono::Duration::minutes(self.duration_minutes as i64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Cancelled,
    #[serde(rename = "no-show")]
    NoShow,
}

impl SessionStatus {
    /// Every status except `scheduled` is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Scheduled)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Scheduled => write!(f, "scheduled"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Cancelled => write!(f, "cancelled"),
            SessionStatus::NoShow => write!(f, "no-show"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Message,
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSessionRequest {
    pub therapy_plan_id: Uuid,
    pub session_date: NaiveDate,
    pub session_time: NaiveTime,
    pub duration_minutes: Option<i32>,
    pub session_type: SessionType,
}

/// Provider-side session update: status and bookkeeping fields only. The
/// slot itself never moves, so availability is not re-validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSessionRequest {
    pub status: Option<SessionStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub notes: Option<String>,
    pub follow_up_required: Option<bool>,
}

// ==============================================================================
// SCHEDULING LOCK MODELS
// ==============================================================================

/// Row shape of the scheduling_locks table. A unique index on lock_key makes
/// insertion the acquisition primitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingLock {
    pub id: Uuid,
    pub lock_key: String,
    pub provider_id: Uuid,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub process_id: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum BookingError {
    #[error("Therapy plan not found")]
    PlanNotFound,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Therapy plan is not active")]
    PlanNotActive,

    #[error("Sessions cannot be booked in the past")]
    PastDateRejected,

    /// Covers both "outside provider hours" and "conflicts with an existing
    /// booking"; callers cannot act on the difference before booking, so one
    /// rejection is surfaced for both.
    #[error("Requested slot is not available")]
    SlotUnavailable,

    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("Session cannot be modified in current status: {0}")]
    InvalidStatusTransition(SessionStatus),

    #[error("Unauthorized access to session")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(!SessionStatus::Scheduled.is_terminal());
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
        assert!(SessionStatus::NoShow.is_terminal());
    }

    #[test]
    fn no_show_serializes_with_hyphen() {
        let json = serde_json::to_string(&SessionStatus::NoShow).unwrap();
        assert_eq!(json, "\"no-show\"");

        let parsed: SessionStatus = serde_json::from_str("\"no-show\"").unwrap();
        assert_eq!(parsed, SessionStatus::NoShow);
    }

    #[test]
    fn session_end_time_adds_duration() {
        let session = Session {
            id: Uuid::new_v4(),
            therapy_plan_id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            session_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            session_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            duration_minutes: 60,
            status: SessionStatus::Scheduled,
            session_type: SessionType::Video,
            notes: None,
            payment_status: PaymentStatus::Unpaid,
            follow_up_required: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(session.end_time(), NaiveTime::from_hms_opt(11, 0, 0).unwrap());
    }
}
