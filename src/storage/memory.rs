use super::{BookingOutcome, BookingRequest, BookingStore, ProfileStore};
use crate::config::NameUpdatePolicy;
use crate::db_types::{Appointment, AppointmentStatus, CallerProfile, User};
use crate::error::{AppError, BookingError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    appointments: Vec<Appointment>,
}

/// Users and appointments behind one lock, so a booking is as atomic as the Postgres
/// transaction it stands in for.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal("memory store poisoned"))
    }

    /// Register a caller as if they had booked before.
    pub fn add_user(&self, full_name: &str, mobile: &str) -> Result<User, AppError> {
        let mut tables = self.lock()?;
        let user = User {
            id: tables.users.len() as i64 + 1,
            full_name: full_name.to_string(),
            mobile: mobile.to_string(),
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    pub fn users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.lock()?.users.clone())
    }

    pub fn appointments(&self) -> Result<Vec<Appointment>, AppError> {
        Ok(self.lock()?.appointments.clone())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn commit_booking(&self, req: &BookingRequest) -> Result<BookingOutcome, BookingError> {
        let mut tables = self
            .lock()
            .map_err(|e| BookingError::Storage(e.to_string()))?;
        let duration_min = i32::try_from(req.duration_minutes)
            .map_err(|_| BookingError::Storage("duration out of range".to_string()))?;

        if let Some(existing) = tables.appointments.iter().find(|a| a.call_id == req.call_id) {
            return Ok(BookingOutcome::Booked(existing.clone()));
        }

        let next_id = tables.users.len() as i64 + 1;
        let user_id = match tables.users.iter_mut().find(|u| u.mobile == req.phone) {
            Some(user) => {
                if req.name_policy == NameUpdatePolicy::Overwrite {
                    user.full_name = req.name.clone();
                }
                user.id
            }
            None => {
                tables.users.push(User {
                    id: next_id,
                    full_name: req.name.clone(),
                    mobile: req.phone.clone(),
                    created_at: Utc::now(),
                });
                next_id
            }
        };

        let ends_at = req.ends_at();
        if let Some(existing) = tables.appointments.iter().find(|a| {
            a.user_id == user_id
                && a.status == AppointmentStatus::Scheduled
                && a.overlaps(req.starts_at, ends_at)
        }) {
            return Ok(BookingOutcome::Duplicate(existing.clone()));
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            user_id,
            call_id: req.call_id.clone(),
            starts_at: req.starts_at,
            duration_min,
            status: AppointmentStatus::Scheduled,
            is_test_data: req.is_test_data,
            google_event_id: None,
            created_at: Utc::now(),
        };
        tables.appointments.push(appointment.clone());
        Ok(BookingOutcome::Booked(appointment))
    }

    async fn set_google_event_id(
        &self,
        appointment_id: Uuid,
        event_id: &str,
    ) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        if let Some(a) = tables.appointments.iter_mut().find(|a| a.id == appointment_id) {
            a.google_event_id = Some(event_id.to_string());
        }
        Ok(())
    }

    async fn unsynced_appointments(&self, limit: i64) -> Result<Vec<(Appointment, User)>, AppError> {
        let tables = self.lock()?;
        let mut pending: Vec<&Appointment> = tables
            .appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Scheduled && a.google_event_id.is_none())
            .collect();
        pending.sort_by_key(|a| a.created_at);
        Ok(pending
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(0))
            .filter_map(|a| {
                tables
                    .users
                    .iter()
                    .find(|u| u.id == a.user_id)
                    .map(|u| (a.clone(), u.clone()))
            })
            .collect())
    }

    async fn purge_test_data(&self, older_than: DateTime<Utc>) -> Result<u64, AppError> {
        let mut tables = self.lock()?;
        let before = tables.appointments.len();
        tables
            .appointments
            .retain(|a| !(a.is_test_data && a.created_at < older_than));
        Ok((before - tables.appointments.len()) as u64)
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn find_profile(&self, mobile: &str) -> Result<Option<CallerProfile>, AppError> {
        let tables = self.lock()?;
        Ok(tables.users.iter().find(|u| u.mobile == mobile).map(|u| {
            CallerProfile {
                full_name: u.full_name.clone(),
                last_appointment_at: tables
                    .appointments
                    .iter()
                    .filter(|a| a.user_id == u.id && a.status != AppointmentStatus::Cancelled)
                    .map(|a| a.starts_at)
                    .max(),
            }
        }))
    }
}
