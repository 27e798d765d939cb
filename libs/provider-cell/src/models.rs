use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// PROVIDER PROFILE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: Uuid,
    pub account_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: Option<String>,
    pub occupation: Option<String>,
    pub address: Option<String>,
    pub specialization: String,
    pub experience_years: i32,
    pub languages: String,
    pub bio: Option<String>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Provider {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProviderRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: Option<String>,
    pub occupation: Option<String>,
    pub address: Option<String>,
    pub specialization: String,
    pub experience_years: Option<i32>,
    pub languages: String,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProviderRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub occupation: Option<String>,
    pub address: Option<String>,
    pub specialization: Option<String>,
    pub experience_years: Option<i32>,
    pub languages: Option<String>,
    pub bio: Option<String>,
}

/// Directory search over the provider listing: specialization and language
/// are substring filters, `search` matches name, specialization or bio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSearchQuery {
    pub specialization: Option<String>,
    pub language: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

// ==============================================================================
// AVAILABILITY MODELS
// ==============================================================================

/// Weekday of a recurring availability window. Serialized lowercase in the
/// store; canonical display order is Monday..Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    /// Canonical Monday-first ordering used by every schedule view.
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn from_date(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recurring weekly window during which a provider accepts bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Availability {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

impl Availability {
    /// Whether `[start, end)` lies entirely inside this window.
    pub fn contains(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.start_time <= start && end <= self.end_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAvailabilityRequest {
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: Option<bool>,
}

/// One weekday's ordered windows in a provider's weekly schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySchedule {
    pub day: DayOfWeek,
    pub windows: Vec<Availability>,
}

/// Slim projection of a scheduled session, fetched when deciding whether a
/// slot is free. Only the occupied time range matters here.
#[derive(Debug, Clone, Deserialize)]
pub struct BookedSlot {
    pub session_time: NaiveTime,
    pub duration_minutes: i32,
}

impl BookedSlot {
    pub fn end_time(&self) -> NaiveTime {
        self.session_time + chrono::Duration::minutes(self.duration_minutes as i64)
    }
}

/// Half-open range overlap: `[a_start, a_end)` and `[b_start, b_end)`
/// overlap iff `a_start < b_end && b_start < a_end`.
pub fn ranges_overlap(
    a_start: NaiveTime,
    a_end: NaiveTime,
    b_start: NaiveTime,
    b_end: NaiveTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider not found")]
    NotFound,

    #[error("Availability window not found")]
    AvailabilityNotFound,

    #[error("Account already has a provider profile")]
    ProfileAlreadyExists,

    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("Unauthorized access to provider data")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
