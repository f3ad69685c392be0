//! Persistence for users and appointments.  `db` is the Postgres implementation used in
//! production; `memory` keeps everything in-process for development and tests.

pub mod db;
pub mod memory;

pub use db::PgStore;
pub use memory::MemoryStore;

use crate::config::NameUpdatePolicy;
use crate::db_types::{Appointment, CallerProfile, User};
use crate::error::{AppError, BookingError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Everything the booking transaction needs, taken from a completed call session.
#[derive(Clone, Debug)]
pub struct BookingRequest {
    pub call_id: String,
    pub name: String,
    /// E.164
    pub phone: String,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub is_test_data: bool,
    pub name_policy: NameUpdatePolicy,
}

impl BookingRequest {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.starts_at + chrono::Duration::minutes(i64::from(self.duration_minutes))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BookingOutcome {
    /// The appointment this call booked.  A replayed confirmation gets the same row back.
    Booked(Appointment),
    /// The caller already holds a scheduled appointment overlapping the request.
    Duplicate(Appointment),
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Resolve or create the user, reject overlaps with their scheduled appointments, and insert
    /// the new appointment, all in one transaction.
    async fn commit_booking(&self, req: &BookingRequest) -> Result<BookingOutcome, BookingError>;

    async fn set_google_event_id(&self, appointment_id: Uuid, event_id: &str)
        -> Result<(), AppError>;

    /// Scheduled appointments still missing a calendar event, oldest first, with their owners.
    async fn unsynced_appointments(&self, limit: i64) -> Result<Vec<(Appointment, User)>, AppError>;

    /// Delete test appointments created before `older_than`.  Real rows are never touched.
    async fn purge_test_data(&self, older_than: DateTime<Utc>) -> Result<u64, AppError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_profile(&self, mobile: &str) -> Result<Option<CallerProfile>, AppError>;
}
