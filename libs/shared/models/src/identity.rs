use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Slim provider record attached to a resolved identity. Enough for
/// ownership checks and dashboard scoping without refetching the profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRef {
    pub id: Uuid,
    pub account_id: String,
    pub first_name: String,
    pub last_name: String,
}

/// Slim patient record attached to a resolved identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRef {
    pub id: Uuid,
    pub account_id: String,
    pub first_name: String,
    pub last_name: String,
}

/// Role context for a request, resolved once after authentication.
///
/// One account maps to at most one provider and at most one patient profile;
/// downstream logic branches on these options instead of re-querying for
/// role membership at every call site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub account_id: String,
    pub provider: Option<ProviderRef>,
    pub patient: Option<PatientRef>,
}

impl Identity {
    pub fn is_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn is_patient(&self) -> bool {
        self.patient.is_some()
    }

    /// True when the account has neither profile yet.
    pub fn is_unenrolled(&self) -> bool {
        self.provider.is_none() && self.patient.is_none()
    }
}
