pub mod booking;
pub mod calendar;
pub mod config;
pub mod conversation_state;
pub mod db_types;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod locale;
pub mod profile;
pub mod prompts;
pub mod session_store;
pub mod storage;
pub mod tasks;
pub mod twilio_types;
pub mod types;

pub mod consts {
    pub const APP_GREETING: &str = "Hi, thanks for calling. I can book an appointment for you.";
    pub const RETRY_LATER: &str =
        "Sorry, we're having trouble on our end right now. Please call back in a few minutes. Goodbye.";
    pub const CANCELLED: &str = "Okay, I won't book anything. Goodbye.";
    pub const CALL_ENDED: &str = "This call has already ended. Please call back to make a booking. Goodbye.";
    pub const CALENDAR_QUEUE_DEPTH: usize = 256;
    pub const CALENDAR_BACKOFF_MILLIS: u64 = 500;
    pub const UNSYNCED_BATCH: i64 = 50;
    pub const UNSYNCED_SWEEP_SECS: u64 = 300;
    pub const SESSION_SWEEP_SECS: u64 = 60;
    pub const PURGE_EVERY_SECS: u64 = 3_600;
}
