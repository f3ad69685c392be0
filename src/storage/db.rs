use super::{BookingOutcome, BookingRequest, BookingStore, ProfileStore};
use crate::config::NameUpdatePolicy;
use crate::db_types::{Appointment, AppointmentStatus, CallerProfile, User};
use crate::error::{AppError, BookingError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, error, info};
use uuid::Uuid;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn upsert_user(
        tx: &mut Transaction<'_, Postgres>,
        req: &BookingRequest,
    ) -> Result<User, sqlx::Error> {
        // The conflicting update also row-locks the user, which serializes concurrent bookings
        // for one phone number until commit.
        let sql = match req.name_policy {
            NameUpdatePolicy::Overwrite => {
                "
                insert into users (full_name, mobile)
                values ($1, $2)
                on conflict (mobile) do update
                  set full_name = excluded.full_name
                returning id, full_name, mobile, created_at
                "
            }
            NameUpdatePolicy::KeepOriginal => {
                "
                insert into users (full_name, mobile)
                values ($1, $2)
                on conflict (mobile) do update
                  set full_name = users.full_name
                returning id, full_name, mobile, created_at
                "
            }
        };
        sqlx::query_as::<_, User>(sql)
            .bind(&req.name)
            .bind(&req.phone)
            .fetch_one(&mut *tx)
            .await
    }

    async fn booked_by_call(
        tx: &mut Transaction<'_, Postgres>,
        call_id: &str,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        sqlx::query_as::<_, Appointment>(
            "
            select id, user_id, call_id, starts_at, duration_min, status, is_test_data,
                   google_event_id, created_at
            from appointments
            where call_id = $1
            ",
        )
        .bind(call_id)
        .fetch_optional(&mut *tx)
        .await
    }

    async fn try_commit(&self, req: &BookingRequest) -> Result<BookingOutcome, BookingError> {
        let duration_min = i32::try_from(req.duration_minutes)
            .map_err(|_| BookingError::Storage("duration out of range".to_string()))?;
        let mut tx = self.pool.begin().await?;

        if let Some(appointment) = Self::booked_by_call(&mut tx, &req.call_id).await? {
            tx.commit().await?;
            debug!(call_id=%req.call_id, appointment_id=%appointment.id, "booking already committed for call");
            return Ok(BookingOutcome::Booked(appointment));
        }

        let user = Self::upsert_user(&mut tx, req).await?;

        // Another delivery of this call may have held the user lock and committed while we waited.
        if let Some(appointment) = Self::booked_by_call(&mut tx, &req.call_id).await? {
            tx.commit().await?;
            debug!(call_id=%req.call_id, appointment_id=%appointment.id, "concurrent delivery booked this call");
            return Ok(BookingOutcome::Booked(appointment));
        }

        let overlapping = sqlx::query_as::<_, Appointment>(
            "
            select id, user_id, call_id, starts_at, duration_min, status, is_test_data,
                   google_event_id, created_at
            from appointments
            where user_id = $1
              and status = 'scheduled'
              and starts_at < $3
              and ends_at > $2
            order by starts_at
            limit 1
            ",
        )
        .bind(user.id)
        .bind(req.starts_at)
        .bind(req.ends_at())
        .fetch_optional(&mut tx)
        .await?;
        if let Some(existing) = overlapping {
            tx.commit().await?;
            return Ok(BookingOutcome::Duplicate(existing));
        }

        // The exclusion constraint backs this insert up; a racing overlap fails with 23P01.
        let appointment = sqlx::query_as::<_, Appointment>(
            "
            insert into appointments
              (id, user_id, call_id, starts_at, ends_at, duration_min, status, is_test_data)
            values ($1, $2, $3, $4, $5, $6, $7, $8)
            returning id, user_id, call_id, starts_at, duration_min, status, is_test_data,
                      google_event_id, created_at
            ",
        )
        .bind(Uuid::new_v4())
        .bind(user.id)
        .bind(&req.call_id)
        .bind(req.starts_at)
        .bind(req.ends_at())
        .bind(duration_min)
        .bind(AppointmentStatus::Scheduled)
        .bind(req.is_test_data)
        .fetch_one(&mut tx)
        .await?;

        tx.commit().await?;
        Ok(BookingOutcome::Booked(appointment))
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn commit_booking(&self, req: &BookingRequest) -> Result<BookingOutcome, BookingError> {
        self.try_commit(req).await.map_err(|e| {
            match &e {
                BookingError::Contention => {
                    debug!(call_id=%req.call_id, "booking transaction contended")
                }
                BookingError::Storage(msg) => {
                    error!(error=%msg, call_id=%req.call_id, "booking transaction failed")
                }
            }
            e
        })
    }

    async fn set_google_event_id(
        &self,
        appointment_id: Uuid,
        event_id: &str,
    ) -> Result<(), AppError> {
        sqlx::query("update appointments set google_event_id = $2 where id = $1")
            .bind(appointment_id)
            .bind(event_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(error=%e, %appointment_id, "failed to record calendar event id");
                AppError::from(e)
            })?;
        Ok(())
    }

    async fn unsynced_appointments(&self, limit: i64) -> Result<Vec<(Appointment, User)>, AppError> {
        let appointments = sqlx::query_as::<_, Appointment>(
            "
            select id, user_id, call_id, starts_at, duration_min, status, is_test_data,
                   google_event_id, created_at
            from appointments
            where status = 'scheduled'
              and google_event_id is null
            order by created_at
            limit $1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(appointments.len());
        for appointment in appointments {
            let user = sqlx::query_as::<_, User>(
                "select id, full_name, mobile, created_at from users where id = $1",
            )
            .bind(appointment.user_id)
            .fetch_one(&self.pool)
            .await?;
            out.push((appointment, user));
        }
        Ok(out)
    }

    async fn purge_test_data(&self, older_than: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            "
            delete from appointments
            where is_test_data
              and created_at < $1
            ",
        )
        .bind(older_than)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(error=%e, "failed to purge test data");
            AppError::from(e)
        })?;
        info!(deleted = result.rows_affected(), cutoff=%older_than, "purged test appointments");
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn find_profile(&self, mobile: &str) -> Result<Option<CallerProfile>, AppError> {
        let profile = sqlx::query_as::<_, CallerProfile>(
            "
            select u.full_name,
                   max(a.starts_at) filter (where a.status <> 'cancelled') as last_appointment_at
            from users u
            left join appointments a on a.user_id = u.id
            where u.mobile = $1
            group by u.id, u.full_name
            ",
        )
        .bind(mobile)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }
}
