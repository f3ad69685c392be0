use crate::config::CalendarConfig;
use crate::db_types::{Appointment, User};
use crate::error::CalendarError;

use async_trait::async_trait;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// A committed appointment waiting for its calendar event.
#[derive(Clone, Debug)]
pub struct SyncJob {
    pub appointment: Appointment,
    pub full_name: String,
    pub mobile: String,
}

impl SyncJob {
    pub fn new(appointment: Appointment, user: &User) -> Self {
        Self {
            appointment,
            full_name: user.full_name.clone(),
            mobile: user.mobile.clone(),
        }
    }
}

/// External calendar.  Returns the provider's event id.
#[async_trait]
pub trait CalendarSync: Send + Sync {
    async fn sync(&self, job: &SyncJob) -> Result<String, CalendarError>;
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date_time: String,
    time_zone: String,
}

#[derive(Serialize, Debug)]
struct EventPayload {
    id: String,
    summary: String,
    description: String,
    start: EventTime,
    end: EventTime,
}

#[derive(Deserialize, Debug)]
struct EventResponse {
    id: String,
}

/// Google Calendar v3 events API.
pub struct GoogleCalendar {
    http_client: reqwest::Client,
    calendar_id: String,
    token: String,
    tz: Tz,
}

impl GoogleCalendar {
    pub fn new(http_client: reqwest::Client, config: &CalendarConfig, tz: Tz) -> Self {
        Self {
            http_client,
            calendar_id: config.calendar_id.clone(),
            token: config.token.clone(),
            tz,
        }
    }

    /// Event ids are base32hex; a dashless UUID qualifies, and reusing the appointment id makes
    /// a repeated insert a 409 instead of a second event.
    fn event_id(appointment: &Appointment) -> String {
        appointment.id.simple().to_string()
    }

    fn payload(&self, job: &SyncJob) -> EventPayload {
        let a = &job.appointment;
        let time = |t: chrono::DateTime<chrono::Utc>| EventTime {
            date_time: t.with_timezone(&self.tz).to_rfc3339(),
            time_zone: self.tz.name().to_string(),
        };
        EventPayload {
            id: Self::event_id(a),
            summary: format!("Appointment: {}", job.full_name),
            description: format!("Booked by phone from {}", job.mobile),
            start: time(a.starts_at),
            end: time(a.ends_at()),
        }
    }
}

#[async_trait]
impl CalendarSync for GoogleCalendar {
    async fn sync(&self, job: &SyncJob) -> Result<String, CalendarError> {
        let url = format!(
            "https://www.googleapis.com/calendar/v3/calendars/{}/events",
            self.calendar_id
        );
        let token = &self.token;
        let resp = self
            .http_client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {token}"))
            .json(&self.payload(job))
            .send()
            .await
            .map_err(|e| {
                error!(error=%e, "failed to send request to Google Calendar");
                CalendarError::from(e)
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::CONFLICT {
            debug!(appointment_id=%job.appointment.id, "calendar event already exists");
            return Ok(Self::event_id(&job.appointment));
        }
        if !status.is_success() {
            return Err(CalendarError::Rejected {
                status: status.as_u16(),
            });
        }
        let event = resp.json::<EventResponse>().await.map_err(|e| {
            error!(error=%e, "failed to deserialize calendar event response");
            CalendarError::from(e)
        })?;
        Ok(event.id)
    }
}

/// Hands committed appointments to the calendar worker without waiting on it.
#[derive(Clone)]
pub struct CalendarDispatcher {
    sink: Option<mpsc::Sender<SyncJob>>,
}

impl CalendarDispatcher {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<SyncJob>) {
        let (sink, stream) = mpsc::channel(capacity);
        (Self { sink: Some(sink) }, stream)
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Never blocks.  A job that cannot be queued stays unsynced in the database and is picked
    /// up by the periodic sweep.
    pub fn dispatch(&self, job: SyncJob) {
        let Some(sink) = &self.sink else {
            return;
        };
        let appointment_id = job.appointment.id;
        match sink.try_send(job) {
            Ok(()) => debug!(%appointment_id, "queued calendar sync"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(%appointment_id, "calendar queue full, leaving for sweep")
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(%appointment_id, "calendar worker gone, leaving for sweep")
            }
        }
    }
}
