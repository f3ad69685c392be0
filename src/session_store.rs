use crate::error::StoreError;
use crate::types::{CallSession, Expected};

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error};

/// Per-call session storage with expiry.  Every `put` refreshes the TTL; sessions of calls that
/// silently drop are reclaimed when it lapses.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, call_id: &str) -> Result<Option<CallSession>, StoreError>;

    /// Write `session` only if the stored revision still matches `expected`; otherwise
    /// `StoreError::Conflict` and nothing changes.
    async fn put(&self, session: &CallSession, expected: Expected) -> Result<(), StoreError>;

    async fn delete(&self, call_id: &str) -> Result<(), StoreError>;

    /// Drop expired entries.  Reads already ignore them; this only reclaims space.
    async fn sweep_expired(&self) -> Result<u64, StoreError>;
}

struct Entry {
    session: CallSession,
    expires_at: Instant,
}

/// In-process session store.  Used for development without a database and in tests.
pub struct MemorySessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, Entry>>,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>, StoreError> {
        self.sessions.lock().map_err(|e| {
            error!(error=%e, "session map poisoned");
            StoreError::Unavailable("session map poisoned".to_string())
        })
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, call_id: &str) -> Result<Option<CallSession>, StoreError> {
        let mut sessions = self.lock()?;
        let now = Instant::now();
        match sessions.get(call_id) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.session.clone())),
            Some(_) => {
                sessions.remove(call_id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, session: &CallSession, expected: Expected) -> Result<(), StoreError> {
        let mut sessions = self.lock()?;
        let now = Instant::now();
        let current = sessions
            .get(&session.call_id)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.session.revision());
        let matches = match expected {
            Expected::Absent => current.is_none(),
            Expected::At(revision) => current == Some(revision),
        };
        if !matches {
            debug!(call_id=%session.call_id, ?expected, ?current, "session precondition failed");
            return Err(StoreError::Conflict);
        }
        sessions.insert(
            session.call_id.clone(),
            Entry {
                session: session.clone(),
                expires_at: now + self.ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, call_id: &str) -> Result<(), StoreError> {
        self.lock()?.remove(call_id);
        Ok(())
    }

    async fn sweep_expired(&self) -> Result<u64, StoreError> {
        let mut sessions = self.lock()?;
        let now = Instant::now();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        Ok((before - sessions.len()) as u64)
    }
}

/// Sessions in the `call_sessions` table.  The conditional write is a single guarded
/// `UPDATE`/`INSERT`, so the row is either at the old revision or the new one.
pub struct PgSessionStore {
    pool: PgPool,
    ttl: Duration,
}

impl PgSessionStore {
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get(&self, call_id: &str) -> Result<Option<CallSession>, StoreError> {
        let body: Option<String> = sqlx::query_scalar(
            "
            select body
            from call_sessions
            where call_id = $1
              and expires_at > now()
            ",
        )
        .bind(call_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(error=%e, call_id=%call_id, "failed to read call session");
            StoreError::from(e)
        })?;
        body.map(|b| serde_json::from_str::<CallSession>(&b))
            .transpose()
            .map_err(|e| {
                error!(error=%e, call_id=%call_id, "failed to deserialize call session");
                StoreError::from(e)
            })
    }

    async fn put(&self, session: &CallSession, expected: Expected) -> Result<(), StoreError> {
        let body = serde_json::to_string(session)?;
        let ttl_secs = self.ttl.as_secs_f64();
        let result = match expected {
            Expected::Absent => {
                sqlx::query(
                    "
                    insert into call_sessions (call_id, state, turn_seq, body, expires_at)
                    values ($1, $2, $3, $4, now() + make_interval(secs => $5))
                    on conflict (call_id) do update
                      set state = excluded.state,
                          turn_seq = excluded.turn_seq,
                          body = excluded.body,
                          expires_at = excluded.expires_at
                      where call_sessions.expires_at <= now()
                    ",
                )
                .bind(&session.call_id)
                .bind(session.state.as_str())
                .bind(i64::from(session.turn_seq))
                .bind(&body)
                .bind(ttl_secs)
                .execute(&self.pool)
                .await
            }
            Expected::At(revision) => {
                sqlx::query(
                    "
                    update call_sessions
                    set state = $2,
                        turn_seq = $3,
                        body = $4,
                        expires_at = now() + make_interval(secs => $5)
                    where call_id = $1
                      and state = $6
                      and turn_seq = $7
                      and expires_at > now()
                    ",
                )
                .bind(&session.call_id)
                .bind(session.state.as_str())
                .bind(i64::from(session.turn_seq))
                .bind(&body)
                .bind(ttl_secs)
                .bind(revision.state.as_str())
                .bind(i64::from(revision.turn_seq))
                .execute(&self.pool)
                .await
            }
        }
        .map_err(|e| {
            error!(error=%e, call_id=%session.call_id, "failed to write call session");
            StoreError::from(e)
        })?;

        if result.rows_affected() == 0 {
            debug!(call_id=%session.call_id, ?expected, "session precondition failed");
            return Err(StoreError::Conflict);
        }
        Ok(())
    }

    async fn delete(&self, call_id: &str) -> Result<(), StoreError> {
        sqlx::query("delete from call_sessions where call_id = $1")
            .bind(call_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(error=%e, call_id=%call_id, "failed to delete call session");
                StoreError::from(e)
            })?;
        Ok(())
    }

    async fn sweep_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("delete from call_sessions where expires_at <= now()")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(error=%e, "failed to sweep expired call sessions");
                StoreError::from(e)
            })?;
        Ok(result.rows_affected())
    }
}
