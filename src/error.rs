use thiserror::Error;
use tracing::error;

/// Infrastructure failures.  Nothing in here is ever spoken to a caller; the call flow maps
/// these onto a reply before they reach the webhook response.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(&'static str),
}

/// Session store failures.  `Conflict` is the optimistic-write precondition failing, which the
/// call flow treats as "another delivery of this turn got there first".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),

    #[error("session precondition failed")]
    Conflict,
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Unavailable(format!("corrupt session body: {e}"))
    }
}

/// Failures of the booking transaction.  A duplicate is not an error; see `BookingOutcome`.
#[derive(Debug, Error)]
pub enum BookingError {
    /// A concurrent transaction touched the same user or interval.  Safe to retry.
    #[error("booking contention")]
    Contention,

    #[error("booking storage failure: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for BookingError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            // serialization_failure, deadlock_detected, exclusion_violation, unique_violation
            if matches!(db_err.code().as_deref(), Some("40001" | "40P01" | "23P01" | "23505")) {
                return BookingError::Contention;
            }
        }
        BookingError::Storage(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("calendar request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("calendar rejected event: {status}")]
    Rejected { status: u16 },
}

pub async fn handle_error(e: impl std::error::Error) {
    error!("ERROR: {e}")
}
