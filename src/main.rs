use twilio_booking::booking::BookingCoordinator;
use twilio_booking::calendar::{CalendarDispatcher, CalendarSync, GoogleCalendar};
use twilio_booking::config::Config;
use twilio_booking::consts::{
    CALENDAR_QUEUE_DEPTH, PURGE_EVERY_SECS, SESSION_SWEEP_SECS, UNSYNCED_SWEEP_SECS,
};
use twilio_booking::conversation_state::CallFlow;
use twilio_booking::handlers;
use twilio_booking::locale::{Clock, SystemClock};
use twilio_booking::profile::CallerProfileResolver;
use twilio_booking::session_store::{MemorySessionStore, PgSessionStore, SessionStore};
use twilio_booking::storage::{BookingStore, MemoryStore, PgStore, ProfileStore};
use twilio_booking::tasks;
use twilio_booking::types::AppState;

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("no .env loaded: {e}");
    }
    let config = Arc::new(Config::from_env().expect("invalid configuration"));

    let subscriber = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_file(true)
                .with_line_number(true),
        )
        .with(tracing_subscriber::filter::Targets::new().with_targets([
            ("hyper", tracing_subscriber::filter::LevelFilter::OFF),
            (
                "twilio_booking",
                tracing_subscriber::filter::LevelFilter::from_level(config.log_level),
            ),
        ]));
    tracing::subscriber::set_global_default(subscriber).unwrap();

    let (sessions, bookings, profiles): (
        Arc<dyn SessionStore>,
        Arc<dyn BookingStore>,
        Arc<dyn ProfileStore>,
    ) = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await
                .expect("could not connect to database");
            sqlx::migrate!()
                .run(&pool)
                .await
                .expect("migrations failed");
            let store = Arc::new(PgStore::new(pool.clone()));
            let sessions: Arc<dyn SessionStore> =
                Arc::new(PgSessionStore::new(pool, config.session_ttl));
            let bookings: Arc<dyn BookingStore> = store.clone();
            let profiles: Arc<dyn ProfileStore> = store;
            (sessions, bookings, profiles)
        }
        None => {
            warn!("DATABASE_URL not set, keeping sessions and bookings in memory");
            let store = Arc::new(MemoryStore::new());
            let sessions: Arc<dyn SessionStore> =
                Arc::new(MemorySessionStore::new(config.session_ttl));
            let bookings: Arc<dyn BookingStore> = store.clone();
            let profiles: Arc<dyn ProfileStore> = store;
            (sessions, bookings, profiles)
        }
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let dispatcher = match &config.calendar {
        Some(calendar_config) => {
            let (dispatcher, jobs) = CalendarDispatcher::new(CALENDAR_QUEUE_DEPTH);
            let calendar: Arc<dyn CalendarSync> = Arc::new(GoogleCalendar::new(
                reqwest::Client::new(),
                calendar_config,
                config.business_hours.tz,
            ));
            tokio::spawn(tasks::run_calendar_sync(
                jobs,
                calendar,
                bookings.clone(),
                calendar_config.max_retries,
            ));
            tokio::spawn(tasks::sweep_unsynced(
                bookings.clone(),
                dispatcher.clone(),
                Duration::from_secs(UNSYNCED_SWEEP_SECS),
            ));
            dispatcher
        }
        None => {
            info!("calendar sync disabled");
            CalendarDispatcher::disabled()
        }
    };

    tokio::spawn(tasks::sweep_sessions(
        sessions.clone(),
        Duration::from_secs(SESSION_SWEEP_SECS),
    ));
    if let Some(retention) = config.test_data_retention {
        tokio::spawn(tasks::purge_test_data(
            bookings.clone(),
            clock.clone(),
            retention,
            Duration::from_secs(PURGE_EVERY_SECS),
        ));
    }

    let flow = CallFlow::new(
        config.clone(),
        sessions,
        CallerProfileResolver::new(profiles),
        BookingCoordinator::new(bookings, dispatcher, config.name_update_policy),
        clock,
    );
    let app_state = Arc::new(AppState { flow });
    let app = handlers::router(app_state);

    info!(addr=%config.listen_addr, "listening");
    axum::Server::bind(&config.listen_addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .unwrap();
}
