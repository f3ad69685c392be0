use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub full_name: String,
    pub mobile: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "appointment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Cancelled,
    Completed,
}

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: i64,
    pub call_id: String,
    pub starts_at: DateTime<Utc>,
    pub duration_min: i32,
    pub status: AppointmentStatus,
    pub is_test_data: bool,
    pub google_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.starts_at + chrono::Duration::minutes(i64::from(self.duration_min))
    }

    /// Half-open interval overlap against `[starts_at, ends_at)`.
    pub fn overlaps(&self, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> bool {
        self.starts_at < ends_at && starts_at < self.ends_at()
    }
}

/// What the caller profile resolver knows about a returning caller.
#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct CallerProfile {
    pub full_name: String,
    pub last_appointment_at: Option<DateTime<Utc>>,
}
