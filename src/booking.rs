use crate::calendar::{CalendarDispatcher, SyncJob};
use crate::config::NameUpdatePolicy;
use crate::error::BookingError;
use crate::storage::{BookingOutcome, BookingRequest, BookingStore};
use crate::types::CallSession;

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

const COMMIT_ATTEMPTS: u32 = 2;

/// Turns a completed call session into an appointment.  Calendar sync is queued after the commit
/// and never affects the outcome.
#[derive(Clone)]
pub struct BookingCoordinator {
    store: Arc<dyn BookingStore>,
    calendar: CalendarDispatcher,
    name_policy: NameUpdatePolicy,
}

impl BookingCoordinator {
    pub fn new(
        store: Arc<dyn BookingStore>,
        calendar: CalendarDispatcher,
        name_policy: NameUpdatePolicy,
    ) -> Self {
        Self {
            store,
            calendar,
            name_policy,
        }
    }

    pub fn request_for(&self, session: &CallSession) -> Option<BookingRequest> {
        let slots = &session.slots;
        Some(BookingRequest {
            call_id: session.call_id.clone(),
            name: slots.name.clone()?,
            phone: slots.phone.clone()?,
            starts_at: slots.starts_at?.with_timezone(&Utc),
            duration_minutes: slots.duration_minutes?,
            is_test_data: session.is_test_data,
            name_policy: self.name_policy,
        })
    }

    /// Commit the booking, retrying once if a concurrent transaction got in the way.
    pub async fn book(&self, session: &CallSession) -> Result<BookingOutcome, BookingError> {
        let req = self
            .request_for(session)
            .ok_or_else(|| BookingError::Storage("session slots incomplete".to_string()))?;

        let mut attempt = 1;
        let outcome = loop {
            match self.store.commit_booking(&req).await {
                Err(BookingError::Contention) if attempt < COMMIT_ATTEMPTS => {
                    warn!(call_id=%req.call_id, attempt, "booking contended, retrying");
                    attempt += 1;
                }
                res => break res?,
            }
        };

        match &outcome {
            BookingOutcome::Booked(appointment) => {
                info!(
                    call_id=%req.call_id,
                    appointment_id=%appointment.id,
                    starts_at=%appointment.starts_at,
                    is_test_data=appointment.is_test_data,
                    "appointment booked"
                );
                if appointment.google_event_id.is_none() {
                    self.calendar.dispatch(SyncJob {
                        appointment: appointment.clone(),
                        full_name: req.name.clone(),
                        mobile: req.phone.clone(),
                    });
                }
            }
            BookingOutcome::Duplicate(existing) => {
                info!(
                    call_id=%req.call_id,
                    existing_id=%existing.id,
                    "caller already holds an overlapping appointment"
                );
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_types::{Appointment, User};
    use crate::error::AppError;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use chrono::{DateTime, FixedOffset, TimeZone};
    use std::sync::atomic::{AtomicU32, Ordering};
    use uuid::Uuid;

    /// Reports contention for the first `contended` commits, then defers to a memory store.
    struct Contended {
        inner: MemoryStore,
        contended: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl BookingStore for Contended {
        async fn commit_booking(
            &self,
            req: &BookingRequest,
        ) -> Result<BookingOutcome, BookingError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.contended {
                return Err(BookingError::Contention);
            }
            self.inner.commit_booking(req).await
        }

        async fn set_google_event_id(&self, id: Uuid, event_id: &str) -> Result<(), AppError> {
            self.inner.set_google_event_id(id, event_id).await
        }

        async fn unsynced_appointments(
            &self,
            limit: i64,
        ) -> Result<Vec<(Appointment, User)>, AppError> {
            self.inner.unsynced_appointments(limit).await
        }

        async fn purge_test_data(&self, older_than: DateTime<Utc>) -> Result<u64, AppError> {
            self.inner.purge_test_data(older_than).await
        }
    }

    fn session() -> CallSession {
        let mut s = CallSession::new("CA1", None, false, Utc::now());
        s.slots.name = Some("John Smith".to_string());
        s.slots.phone = Some("+14165551234".to_string());
        s.slots.starts_at = Some(
            FixedOffset::west_opt(4 * 3600)
                .unwrap()
                .with_ymd_and_hms(2026, 10, 15, 14, 0, 0)
                .unwrap(),
        );
        s.slots.duration_minutes = Some(30);
        s
    }

    fn coordinator(contended: u32) -> (BookingCoordinator, Arc<Contended>) {
        let store = Arc::new(Contended {
            inner: MemoryStore::new(),
            contended,
            calls: AtomicU32::new(0),
        });
        let coordinator = BookingCoordinator::new(
            store.clone(),
            CalendarDispatcher::disabled(),
            NameUpdatePolicy::Overwrite,
        );
        (coordinator, store)
    }

    #[tokio::test]
    async fn retries_contention_once() {
        let (coordinator, store) = coordinator(1);
        let outcome = coordinator.book(&session()).await.unwrap();
        assert!(matches!(outcome, BookingOutcome::Booked(_)));
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn repeated_contention_surfaces() {
        let (coordinator, store) = coordinator(2);
        assert!(matches!(
            coordinator.book(&session()).await,
            Err(BookingError::Contention)
        ));
        assert!(store.inner.appointments().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stores_utc_instant_and_queues_sync() {
        let store = Arc::new(MemoryStore::new());
        let (dispatcher, mut jobs) = CalendarDispatcher::new(4);
        let coordinator =
            BookingCoordinator::new(store.clone(), dispatcher, NameUpdatePolicy::Overwrite);

        let BookingOutcome::Booked(appointment) = coordinator.book(&session()).await.unwrap()
        else {
            panic!("expected a booking");
        };
        assert_eq!(
            appointment.starts_at,
            Utc.with_ymd_and_hms(2026, 10, 15, 18, 0, 0).unwrap()
        );
        let job = jobs.recv().await.unwrap();
        assert_eq!(job.appointment.id, appointment.id);
        assert_eq!(job.full_name, "John Smith");
    }

    #[tokio::test]
    async fn incomplete_session_is_not_booked() {
        let (coordinator, _) = coordinator(0);
        let mut s = session();
        s.slots.phone = None;
        assert!(matches!(
            coordinator.book(&s).await,
            Err(BookingError::Storage(_))
        ));
    }
}
