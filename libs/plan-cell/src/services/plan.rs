use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    CreateTherapyPlanRequest, PlanError, PlanStatus, PlanType, TherapyPlan,
};

pub struct PlanService {
    supabase: SupabaseClient,
}

impl PlanService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Active plan types in the catalogue, ordered by name.
    pub async fn list_plan_types(&self, auth_token: &str) -> Result<Vec<PlanType>, PlanError> {
        let path = "/rest/v1/plan_types?is_active=eq.true&order=name.asc";
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| PlanError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<PlanType>, _>>()
            .map_err(|e| PlanError::DatabaseError(e.to_string()))
    }

    pub async fn get_plan_type(
        &self,
        plan_type_id: Uuid,
        auth_token: &str,
    ) -> Result<PlanType, PlanError> {
        let path = format!("/rest/v1/plan_types?id=eq.{}", plan_type_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PlanError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(PlanError::PlanTypeNotFound)?;
        serde_json::from_value(row).map_err(|e| PlanError::DatabaseError(e.to_string()))
    }

    /// Providers registered as supporting a plan type.
    pub async fn providers_for_plan_type(
        &self,
        plan_type_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Uuid>, PlanError> {
        let path = format!(
            "/rest/v1/plan_type_providers?plan_type_id=eq.{}&select=provider_id",
            plan_type_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PlanError::DatabaseError(e.to_string()))?;

        result
            .iter()
            .map(|row| {
                row["provider_id"]
                    .as_str()
                    .and_then(|s| Uuid::parse_str(s).ok())
                    .ok_or_else(|| PlanError::DatabaseError("Malformed provider reference".to_string()))
            })
            .collect()
    }

    /// Enrol a provider as supporting a plan type.
    pub async fn add_supporting_provider(
        &self,
        plan_type_id: Uuid,
        provider_id: Uuid,
        auth_token: &str,
    ) -> Result<(), PlanError> {
        // Validate the plan type exists before writing the membership row.
        self.get_plan_type(plan_type_id, auth_token).await?;

        let membership = json!({
            "plan_type_id": plan_type_id,
            "provider_id": provider_id
        });

        self.supabase
            .request_no_content(
                Method::POST,
                "/rest/v1/plan_type_providers",
                Some(auth_token),
                Some(membership),
            )
            .await
            .map_err(|e| PlanError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    /// Create a therapy plan for a patient.
    ///
    /// The plan type must be active and the chosen provider must be in its
    /// supporting set at creation time; the plan's cost is copied from the
    /// type's base cost so later catalogue changes do not reprice it.
    pub async fn create_plan(
        &self,
        patient_id: Uuid,
        request: CreateTherapyPlanRequest,
        auth_token: &str,
    ) -> Result<TherapyPlan, PlanError> {
        debug!(
            "Creating therapy plan for patient {} with provider {}",
            patient_id, request.provider_id
        );

        let plan_type = self.get_plan_type(request.plan_type_id, auth_token).await?;
        if !plan_type.is_active {
            return Err(PlanError::PlanTypeInactive);
        }

        let supporting = self
            .providers_for_plan_type(request.plan_type_id, auth_token)
            .await?;
        if !supporting.contains(&request.provider_id) {
            return Err(PlanError::ProviderNotSupported);
        }

        let plan_data = json!({
            "patient_id": patient_id,
            "provider_id": request.provider_id,
            "plan_type_id": request.plan_type_id,
            "status": PlanStatus::Active,
            "start_date": request.start_date.map(|d| d.format("%Y-%m-%d").to_string()),
            "notes": request.notes,
            "cost": plan_type.base_cost,
            "created_at": chrono::Utc::now().to_rfc3339(),
            "updated_at": chrono::Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/therapy_plans",
                Some(auth_token),
                Some(plan_data),
                Some(headers),
            )
            .await
            .map_err(|e| PlanError::DatabaseError(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| PlanError::DatabaseError("Failed to create therapy plan".to_string()))?;

        let plan: TherapyPlan = serde_json::from_value(row)
            .map_err(|e| PlanError::DatabaseError(e.to_string()))?;
        info!("Therapy plan {} created for patient {}", plan.id, patient_id);

        Ok(plan)
    }

    pub async fn get_plan(
        &self,
        plan_id: Uuid,
        auth_token: &str,
    ) -> Result<TherapyPlan, PlanError> {
        let path = format!("/rest/v1/therapy_plans?id=eq.{}", plan_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PlanError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(PlanError::PlanNotFound)?;
        serde_json::from_value(row).map_err(|e| PlanError::DatabaseError(e.to_string()))
    }

    /// Change a plan's lifecycle status. Only the plan's provider may do so.
    pub async fn update_plan_status(
        &self,
        acting_provider_id: Uuid,
        plan_id: Uuid,
        status: PlanStatus,
        auth_token: &str,
    ) -> Result<TherapyPlan, PlanError> {
        let plan = self.get_plan(plan_id, auth_token).await?;
        if !plan.is_provider(acting_provider_id) {
            return Err(PlanError::Unauthorized);
        }

        let update_data = json!({
            "status": status,
            "updated_at": chrono::Utc::now().to_rfc3339()
        });

        let path = format!("/rest/v1/therapy_plans?id=eq.{}", plan_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(update_data),
                Some(headers),
            )
            .await
            .map_err(|e| PlanError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(PlanError::PlanNotFound)?;
        serde_json::from_value(row).map_err(|e| PlanError::DatabaseError(e.to_string()))
    }

    /// Protected delete: a plan type referenced by any therapy plan stays.
    pub async fn delete_plan_type(
        &self,
        plan_type_id: Uuid,
        auth_token: &str,
    ) -> Result<(), PlanError> {
        let refs_path = format!(
            "/rest/v1/therapy_plans?plan_type_id=eq.{}&select=id&limit=1",
            plan_type_id
        );
        let referencing: Vec<Value> = self
            .supabase
            .request(Method::GET, &refs_path, Some(auth_token), None)
            .await
            .map_err(|e| PlanError::DatabaseError(e.to_string()))?;

        if !referencing.is_empty() {
            return Err(PlanError::PlanTypeInUse);
        }

        let path = format!("/rest/v1/plan_types?id=eq.{}", plan_type_id);
        self.supabase
            .request_no_content(Method::DELETE, &path, Some(auth_token), None)
            .await
            .map_err(|e| PlanError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
