use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A therapy plan offering in the catalogue. Cost is fixed per type; the
/// plan instance copies it at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanType {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub base_cost: Option<f64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanStatus::Active => write!(f, "active"),
            PlanStatus::Paused => write!(f, "paused"),
            PlanStatus::Completed => write!(f, "completed"),
            PlanStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// An agreement between one patient and one provider under a plan type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TherapyPlan {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub plan_type_id: Uuid,
    pub status: PlanStatus,
    pub start_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub cost: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TherapyPlan {
    pub fn is_active(&self) -> bool {
        self.status == PlanStatus::Active
    }

    /// The two party accounts are reachable via patient_id/provider_id;
    /// convenience predicate for ownership checks.
    pub fn is_provider(&self, provider_id: Uuid) -> bool {
        self.provider_id == provider_id
    }

    pub fn is_patient(&self, patient_id: Uuid) -> bool {
        self.patient_id == patient_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTherapyPlanRequest {
    pub provider_id: Uuid,
    pub plan_type_id: Uuid,
    pub start_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePlanStatusRequest {
    pub status: PlanStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum PlanError {
    #[error("Plan type not found")]
    PlanTypeNotFound,

    #[error("Therapy plan not found")]
    PlanNotFound,

    #[error("Plan type is not active")]
    PlanTypeInactive,

    #[error("Provider does not support this plan type")]
    ProviderNotSupported,

    #[error("Plan type is referenced by existing therapy plans")]
    PlanTypeInUse,

    #[error("Unauthorized access to therapy plan")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
