use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use provider_cell::services::AvailabilityService;
use provider_cell::models::ProviderError;
use plan_cell::services::PlanService;

use crate::models::{
    BookSessionRequest, BookingError, PaymentStatus, Session, SessionStatus,
    UpdateSessionRequest, DEFAULT_SESSION_MINUTES,
};
use crate::services::lifecycle::{SessionLifecycleService, TransitionOutcome};
use crate::services::locking::SchedulingLockService;

const MAX_BOOKING_ATTEMPTS: u32 = 3;

pub struct SessionBookingService {
    supabase: Arc<SupabaseClient>,
    availability_service: AvailabilityService,
    plan_service: PlanService,
    lifecycle_service: SessionLifecycleService,
    lock_service: SchedulingLockService,
}

impl SessionBookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self {
            availability_service: AvailabilityService::new(config),
            plan_service: PlanService::new(config),
            lifecycle_service: SessionLifecycleService::new(),
            lock_service: SchedulingLockService::new(Arc::clone(&supabase)),
            supabase,
        }
    }

    /// Book a session against a therapy plan.
    ///
    /// Validation order is fixed: plan state, then past-date, then slot
    /// availability. The availability check and the insert run under the
    /// provider/date scheduling lock so two concurrent callers cannot both
    /// observe a free slot.
    pub async fn book_session(
        &self,
        patient_id: Uuid,
        request: BookSessionRequest,
        auth_token: &str,
    ) -> Result<Session, BookingError> {
        info!(
            "Booking session on plan {} for {} at {}",
            request.therapy_plan_id, request.session_date, request.session_time
        );

        let plan = self
            .plan_service
            .get_plan(request.therapy_plan_id, auth_token)
            .await
            .map_err(|e| match e {
                plan_cell::models::PlanError::PlanNotFound => BookingError::PlanNotFound,
                other => BookingError::DatabaseError(other.to_string()),
            })?;

        if !plan.is_patient(patient_id) {
            return Err(BookingError::Unauthorized);
        }

        if !plan.is_active() {
            return Err(BookingError::PlanNotActive);
        }

        if request.session_date < Utc::now().date_naive() {
            return Err(BookingError::PastDateRejected);
        }

        let duration = request.duration_minutes.unwrap_or(DEFAULT_SESSION_MINUTES);
        if duration <= 0 {
            return Err(BookingError::InvalidTimeRange(
                "duration must be positive".to_string(),
            ));
        }

        let (_, wrapped) = request
            .session_time
            .overflowing_add_signed(chrono::Duration::minutes(duration as i64));
        if wrapped != 0 {
            return Err(BookingError::InvalidTimeRange(
                "session may not cross midnight".to_string(),
            ));
        }

        let lock_key = SchedulingLockService::lock_key(plan.provider_id, request.session_date);

        for attempt in 1..=MAX_BOOKING_ATTEMPTS {
            debug!("Booking attempt {} for lock {}", attempt, lock_key);

            if !self
                .lock_service
                .acquire(&lock_key, plan.provider_id, auth_token)
                .await?
            {
                // Another booking for this provider/date is in flight.
                if attempt < MAX_BOOKING_ATTEMPTS {
                    tokio::time::sleep(tokio::time::Duration::from_millis(100 * attempt as u64)).await;
                    continue;
                }
                warn!("Could not acquire scheduling lock {} after {} attempts", lock_key, attempt);
                return Err(BookingError::SlotUnavailable);
            }

            let result = self
                .book_under_lock(&plan, &request, duration, auth_token)
                .await;

            self.lock_service.release(&lock_key, auth_token).await?;

            return result;
        }

        Err(BookingError::SlotUnavailable)
    }

    /// The critical section: final availability check plus insert.
    async fn book_under_lock(
        &self,
        plan: &plan_cell::models::TherapyPlan,
        request: &BookSessionRequest,
        duration: i32,
        auth_token: &str,
    ) -> Result<Session, BookingError> {
        let end_time = request.session_time + chrono::Duration::minutes(duration as i64);

        let free = self
            .availability_service
            .is_free(
                plan.provider_id,
                request.session_date,
                request.session_time,
                end_time,
                auth_token,
            )
            .await
            .map_err(|e| match e {
                ProviderError::InvalidTimeRange(msg) => BookingError::InvalidTimeRange(msg),
                other => BookingError::DatabaseError(other.to_string()),
            })?;

        if !free {
            debug!(
                "Slot {}-{} on {} rejected for provider {}",
                request.session_time, end_time, request.session_date, plan.provider_id
            );
            return Err(BookingError::SlotUnavailable);
        }

        let session_data = json!({
            "therapy_plan_id": plan.id,
            "provider_id": plan.provider_id,
            "patient_id": plan.patient_id,
            "session_date": request.session_date.format("%Y-%m-%d").to_string(),
            "session_time": request.session_time.format("%H:%M:%S").to_string(),
            "duration_minutes": duration,
            "status": SessionStatus::Scheduled,
            "session_type": request.session_type,
            "payment_status": PaymentStatus::Unpaid,
            "follow_up_required": false,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/sessions",
                Some(auth_token),
                Some(session_data),
                Some(headers),
            )
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| BookingError::DatabaseError("Failed to create session".to_string()))?;

        let session: Session = serde_json::from_value(row)
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;
        info!("Session {} booked on plan {}", session.id, plan.id);

        Ok(session)
    }

    pub async fn get_session(
        &self,
        session_id: Uuid,
        auth_token: &str,
    ) -> Result<Session, BookingError> {
        let path = format!("/rest/v1/sessions?id=eq.{}", session_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(BookingError::SessionNotFound)?;
        serde_json::from_value(row).map_err(|e| BookingError::DatabaseError(e.to_string()))
    }

    /// Provider-side update of status and bookkeeping fields. Re-asserting
    /// the current status writes nothing, so completing or no-showing a
    /// session twice has no effect beyond the first call.
    pub async fn update_session(
        &self,
        acting_provider_id: Uuid,
        session_id: Uuid,
        request: UpdateSessionRequest,
        auth_token: &str,
    ) -> Result<Session, BookingError> {
        debug!("Updating session: {}", session_id);

        let current = self.get_session(session_id, auth_token).await?;

        if current.provider_id != acting_provider_id {
            return Err(BookingError::Unauthorized);
        }

        let mut update_data = serde_json::Map::new();

        if let Some(new_status) = &request.status {
            match self
                .lifecycle_service
                .validate_transition(&current.status, new_status)?
            {
                TransitionOutcome::Apply => {
                    update_data.insert("status".to_string(), json!(new_status));
                }
                TransitionOutcome::NoOp => {}
            }
        }
        if let Some(payment_status) = &request.payment_status {
            if *payment_status != current.payment_status {
                update_data.insert("payment_status".to_string(), json!(payment_status));
            }
        }
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }
        if let Some(follow_up) = request.follow_up_required {
            if follow_up != current.follow_up_required {
                update_data.insert("follow_up_required".to_string(), json!(follow_up));
            }
        }

        if update_data.is_empty() {
            debug!("Session {} update is a no-op", session_id);
            return Ok(current);
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/sessions?id=eq.{}", session_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(headers),
            )
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(BookingError::SessionNotFound)?;
        serde_json::from_value(row).map_err(|e| BookingError::DatabaseError(e.to_string()))
    }

    /// Patient-side cancellation of their own scheduled session.
    pub async fn cancel_own_session(
        &self,
        acting_patient_id: Uuid,
        session_id: Uuid,
        auth_token: &str,
    ) -> Result<Session, BookingError> {
        let current = self.get_session(session_id, auth_token).await?;

        if current.patient_id != acting_patient_id {
            return Err(BookingError::Unauthorized);
        }

        match self
            .lifecycle_service
            .validate_transition(&current.status, &SessionStatus::Cancelled)?
        {
            TransitionOutcome::NoOp => return Ok(current),
            TransitionOutcome::Apply => {}
        }

        let update_data = json!({
            "status": SessionStatus::Cancelled,
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!("/rest/v1/sessions?id=eq.{}", session_id);
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
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(BookingError::SessionNotFound)?;
        let session: Session = serde_json::from_value(row)
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;
        info!("Session {} cancelled by patient {}", session_id, acting_patient_id);

        Ok(session)
    }
}
