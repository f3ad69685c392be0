//! Background work that runs beside the webhook handlers: calendar sync with retries and the
//! periodic sweeps.

use crate::calendar::{CalendarDispatcher, CalendarSync, SyncJob};
use crate::consts::{CALENDAR_BACKOFF_MILLIS, UNSYNCED_BATCH};
use crate::error::handle_error;
use crate::locale::Clock;
use crate::session_store::SessionStore;
use crate::storage::BookingStore;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Task that drains the calendar queue, syncing each appointment on its own task so one slow
/// provider call does not hold up the rest.
pub async fn run_calendar_sync(
    mut jobs: mpsc::Receiver<SyncJob>,
    calendar: Arc<dyn CalendarSync>,
    store: Arc<dyn BookingStore>,
    max_retries: u32,
) {
    while let Some(job) = jobs.recv().await {
        tokio::spawn(sync_with_retry(
            job,
            calendar.clone(),
            store.clone(),
            max_retries,
        ));
    }
    debug!("calendar queue closed");
}

/// Sync one appointment, backing off exponentially between attempts.  Returns whether the event
/// id was recorded.
pub async fn sync_with_retry(
    job: SyncJob,
    calendar: Arc<dyn CalendarSync>,
    store: Arc<dyn BookingStore>,
    max_retries: u32,
) -> bool {
    let appointment_id = job.appointment.id;
    let mut delay = Duration::from_millis(CALENDAR_BACKOFF_MILLIS);
    for attempt in 1..=max_retries.max(1) {
        match calendar.sync(&job).await {
            Ok(event_id) => {
                if let Err(e) = store.set_google_event_id(appointment_id, &event_id).await {
                    handle_error(e).await;
                    return false;
                }
                info!(%appointment_id, event_id=%event_id, attempt, "appointment synced to calendar");
                return true;
            }
            Err(e) => {
                warn!(error=%e, %appointment_id, attempt, "calendar sync failed");
                if attempt < max_retries {
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
    warn!(%appointment_id, "calendar sync gave up, leaving for sweep");
    false
}

/// Queue every scheduled appointment still missing its calendar event.
pub async fn requeue_unsynced(store: &dyn BookingStore, dispatcher: &CalendarDispatcher) -> usize {
    match store.unsynced_appointments(UNSYNCED_BATCH).await {
        Ok(rows) => {
            let n = rows.len();
            for (appointment, user) in rows {
                dispatcher.dispatch(SyncJob::new(appointment, &user));
            }
            n
        }
        Err(e) => {
            handle_error(e).await;
            0
        }
    }
}

pub async fn sweep_unsynced(
    store: Arc<dyn BookingStore>,
    dispatcher: CalendarDispatcher,
    every: Duration,
) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        let n = requeue_unsynced(store.as_ref(), &dispatcher).await;
        if n > 0 {
            info!(count = n, "requeued unsynced appointments");
        }
    }
}

pub async fn sweep_sessions(sessions: Arc<dyn SessionStore>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        match sessions.sweep_expired().await {
            Ok(0) => (),
            Ok(n) => debug!(count = n, "removed expired call sessions"),
            Err(e) => handle_error(e).await,
        }
    }
}

/// Delete test appointments older than `retention`, measured from the clock's now.
pub async fn purge_test_data(
    store: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
    retention: chrono::Duration,
    every: Duration,
) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        let cutoff = clock.now() - retention;
        if let Err(e) = store.purge_test_data(cutoff).await {
            handle_error(e).await;
        }
    }
}
