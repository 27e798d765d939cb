use chrono::{NaiveDate, NaiveTime};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Availability, BookedSlot, CreateAvailabilityRequest, DaySchedule, DayOfWeek, ProviderError,
    ranges_overlap,
};

/// The availability engine: expands a provider's recurring weekly windows
/// and answers whether a concrete date+time range is bookable.
pub struct AvailabilityService {
    supabase: SupabaseClient,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Add a recurring window. Inverted or zero-length ranges are rejected;
    /// overlap with existing windows for the same day is deliberately NOT
    /// rejected here (a data-quality concern for the owner, not an
    /// invariant of the model).
    pub async fn create_availability(
        &self,
        provider_id: Uuid,
        request: CreateAvailabilityRequest,
        auth_token: &str,
    ) -> Result<Availability, ProviderError> {
        debug!("Creating availability for provider: {}", provider_id);

        if request.start_time >= request.end_time {
            return Err(ProviderError::InvalidTimeRange(
                "start_time must be before end_time".to_string(),
            ));
        }

        let availability_data = json!({
            "provider_id": provider_id,
            "day_of_week": request.day_of_week,
            "start_time": request.start_time.format("%H:%M:%S").to_string(),
            "end_time": request.end_time.format("%H:%M:%S").to_string(),
            "is_available": request.is_available.unwrap_or(true),
            "created_at": chrono::Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/availabilities",
                Some(auth_token),
                Some(availability_data),
                Some(headers),
            )
            .await
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::DatabaseError("Failed to create availability".to_string()))?;

        let availability: Availability = serde_json::from_value(row)
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))?;
        debug!("Availability created with ID: {}", availability.id);

        Ok(availability)
    }

    /// Delete a window after checking it belongs to the acting provider.
    pub async fn delete_availability(
        &self,
        provider_id: Uuid,
        availability_id: Uuid,
        auth_token: &str,
    ) -> Result<(), ProviderError> {
        debug!("Deleting availability: {}", availability_id);

        let path = format!("/rest/v1/availabilities?id=eq.{}", availability_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(ProviderError::AvailabilityNotFound)?;
        let availability: Availability = serde_json::from_value(row)
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        if availability.provider_id != provider_id {
            return Err(ProviderError::Unauthorized);
        }

        self.supabase
            .request_no_content(Method::DELETE, &path, Some(auth_token), None)
            .await
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    /// Open windows for one weekday, ordered by start time. No windows is a
    /// normal empty answer, never an error.
    pub async fn windows_for_day(
        &self,
        provider_id: Uuid,
        day: DayOfWeek,
        auth_token: &str,
    ) -> Result<Vec<Availability>, ProviderError> {
        let path = format!(
            "/rest/v1/availabilities?provider_id=eq.{}&day_of_week=eq.{}&is_available=eq.true&order=start_time.asc",
            provider_id, day
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Availability>, _>>()
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))
    }

    /// The full weekly schedule grouped Monday..Sunday, built fresh per
    /// query. Days without open windows are omitted from the result.
    pub async fn weekly_schedule(
        &self,
        provider_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<DaySchedule>, ProviderError> {
        let path = format!(
            "/rest/v1/availabilities?provider_id=eq.{}&is_available=eq.true",
            provider_id
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        let windows = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Availability>, _>>()
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        Ok(group_by_day(windows))
    }

    /// Decide whether `[start, end)` on `date` is bookable for a provider.
    ///
    /// The range must lie inside at least one open window for the date's
    /// weekday, and must not overlap any scheduled session on that date.
    /// When no window matches, sessions are not consulted at all.
    pub async fn is_free(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        auth_token: &str,
    ) -> Result<bool, ProviderError> {
        if end <= start {
            return Err(ProviderError::InvalidTimeRange(
                "end must be after start".to_string(),
            ));
        }

        let day = DayOfWeek::from_date(date);
        let windows = self.windows_for_day(provider_id, day, auth_token).await?;

        if !windows.iter().any(|w| w.contains(start, end)) {
            debug!(
                "Slot {}-{} on {} outside provider {} hours",
                start, end, date, provider_id
            );
            return Ok(false);
        }

        let booked = self.scheduled_slots(provider_id, date, auth_token).await?;
        let conflict = booked
            .iter()
            .any(|slot| ranges_overlap(start, end, slot.session_time, slot.end_time()));

        if conflict {
            debug!(
                "Slot {}-{} on {} conflicts with an existing booking for provider {}",
                start, end, date, provider_id
            );
        }

        Ok(!conflict)
    }

    /// Scheduled sessions occupying time on the given provider/date.
    async fn scheduled_slots(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<BookedSlot>, ProviderError> {
        let path = format!(
            "/rest/v1/sessions?provider_id=eq.{}&session_date=eq.{}&status=eq.scheduled&select=session_time,duration_minutes&order=session_time.asc",
            provider_id,
            date.format("%Y-%m-%d")
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<BookedSlot>, _>>()
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))
    }
}

/// Fold a flat window list into canonical Monday..Sunday day groups,
/// each ordered by start time. Pure; rebuilt on every call.
fn group_by_day(windows: Vec<Availability>) -> Vec<DaySchedule> {
    DayOfWeek::ALL
        .iter()
        .filter_map(|&day| {
            let mut day_windows: Vec<Availability> = windows
                .iter()
                .filter(|w| w.day_of_week == day)
                .cloned()
                .collect();
            if day_windows.is_empty() {
                return None;
            }
            day_windows.sort_by_key(|w| w.start_time);
            Some(DaySchedule { day, windows: day_windows })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn window(day: DayOfWeek, start: NaiveTime, end: NaiveTime) -> Availability {
        Availability {
            id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            day_of_week: day,
            start_time: start,
            end_time: end,
            is_available: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn grouping_orders_days_monday_first() {
        let windows = vec![
            window(DayOfWeek::Friday, t(14, 0), t(17, 0)),
            window(DayOfWeek::Monday, t(9, 0), t(12, 0)),
            window(DayOfWeek::Wednesday, t(10, 0), t(13, 0)),
        ];

        let schedule = group_by_day(windows);
        let days: Vec<DayOfWeek> = schedule.iter().map(|d| d.day).collect();
        assert_eq!(days, vec![DayOfWeek::Monday, DayOfWeek::Wednesday, DayOfWeek::Friday]);
    }

    #[test]
    fn grouping_orders_windows_within_day() {
        let windows = vec![
            window(DayOfWeek::Monday, t(14, 0), t(17, 0)),
            window(DayOfWeek::Monday, t(9, 0), t(12, 0)),
        ];

        let schedule = group_by_day(windows);
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].windows[0].start_time, t(9, 0));
        assert_eq!(schedule[0].windows[1].start_time, t(14, 0));
    }

    #[test]
    fn grouping_omits_empty_days() {
        let windows = vec![window(DayOfWeek::Tuesday, t(9, 0), t(11, 0))];
        let schedule = group_by_day(windows);
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].day, DayOfWeek::Tuesday);
    }

    #[test]
    fn grouping_of_nothing_is_empty() {
        assert!(group_by_day(vec![]).is_empty());
    }
}
