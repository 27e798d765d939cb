use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{BookingError, SchedulingLock};

const LOCK_TIMEOUT_SECONDS: i64 = 30;

/// Per-provider-per-date scheduling lock.
///
/// The original check-then-write booking path let two callers both observe a
/// free slot and both insert. Here the conflict check and the insert run
/// under a lock row keyed `provider:{id}:date:{date}`: a unique index on
/// lock_key makes insertion the acquisition primitive, and expiry timestamps
/// let crashed holders be cleaned up instead of wedging the slot.
pub struct SchedulingLockService {
    supabase: Arc<SupabaseClient>,
}

impl SchedulingLockService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub fn lock_key(provider_id: Uuid, date: NaiveDate) -> String {
        format!("provider:{}:date:{}", provider_id, date.format("%Y-%m-%d"))
    }

    /// Try to acquire the lock. Returns false when a live holder exists.
    pub async fn acquire(
        &self,
        lock_key: &str,
        provider_id: Uuid,
        auth_token: &str,
    ) -> Result<bool, BookingError> {
        if self.try_insert_lock(lock_key, provider_id, auth_token).await? {
            debug!("Scheduling lock acquired: {}", lock_key);
            return Ok(true);
        }

        // Insert failed: the key is held. Clear it if expired, then retry
        // the insert exactly once.
        if self.cleanup_expired_lock(lock_key, auth_token).await? {
            return self.try_insert_lock(lock_key, provider_id, auth_token).await;
        }

        debug!("Scheduling lock busy: {}", lock_key);
        Ok(false)
    }

    pub async fn release(&self, lock_key: &str, auth_token: &str) -> Result<(), BookingError> {
        let path = format!(
            "/rest/v1/scheduling_locks?lock_key=eq.{}",
            urlencoding::encode(lock_key)
        );
        self.supabase
            .request_no_content(Method::DELETE, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        debug!("Scheduling lock released: {}", lock_key);
        Ok(())
    }

    async fn try_insert_lock(
        &self,
        lock_key: &str,
        provider_id: Uuid,
        auth_token: &str,
    ) -> Result<bool, BookingError> {
        let lock = SchedulingLock {
            id: Uuid::new_v4(),
            lock_key: lock_key.to_string(),
            provider_id,
            acquired_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::seconds(LOCK_TIMEOUT_SECONDS),
            process_id: format!("booking_{}", Uuid::new_v4()),
        };
        let lock_data = serde_json::to_value(&lock)
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        match self
            .supabase
            .request_no_content(
                Method::POST,
                "/rest/v1/scheduling_locks",
                Some(auth_token),
                Some(lock_data),
            )
            .await
        {
            Ok(()) => Ok(true),
            // A failed insert is the normal contended case: the unique
            // index rejected the duplicate key.
            Err(e) => {
                debug!("Lock insert rejected for {}: {}", lock_key, e);
                Ok(false)
            }
        }
    }

    /// Delete the lock row when its holder's lease has expired. Returns
    /// true when a row was actually cleared.
    async fn cleanup_expired_lock(
        &self,
        lock_key: &str,
        auth_token: &str,
    ) -> Result<bool, BookingError> {
        let path = format!(
            "/rest/v1/scheduling_locks?lock_key=eq.{}&select=expires_at",
            urlencoding::encode(lock_key)
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let Some(row) = rows.first() else {
            // Holder released between our insert attempt and this check.
            return Ok(true);
        };

        let expires_at = row["expires_at"]
            .as_str()
            .and_then(|s| s.parse::<DateTime<Utc>>().ok())
            .ok_or_else(|| BookingError::DatabaseError("Malformed lock row".to_string()))?;

        if expires_at > Utc::now() {
            return Ok(false);
        }

        warn!("Clearing expired scheduling lock: {}", lock_key);
        let delete_path = format!(
            "/rest/v1/scheduling_locks?lock_key=eq.{}&expires_at=lte.{}",
            urlencoding::encode(lock_key),
            Utc::now().to_rfc3339()
        );
        self.supabase
            .request_no_content(Method::DELETE, &delete_path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_key_is_per_provider_per_date() {
        let provider = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let key = SchedulingLockService::lock_key(provider, date);

        assert!(key.starts_with("provider:"));
        assert!(key.contains(&provider.to_string()));
        assert!(key.ends_with("date:2024-06-03"));

        let other_day = SchedulingLockService::lock_key(provider, date.succ_opt().unwrap());
        assert_ne!(key, other_day);
    }
}
