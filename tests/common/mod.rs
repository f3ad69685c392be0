#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use twilio_booking::booking::BookingCoordinator;
use twilio_booking::calendar::CalendarDispatcher;
use twilio_booking::config::Config;
use twilio_booking::conversation_state::CallFlow;
use twilio_booking::locale::FixedClock;
use twilio_booking::profile::CallerProfileResolver;
use twilio_booking::session_store::{MemorySessionStore, SessionStore};
use twilio_booking::storage::{BookingStore, MemoryStore};
use twilio_booking::types::{NextStep, Reply, Turn};

pub const JOHN: [&str; 4] = [
    "John Smith",
    "four one six five five five one two three four",
    "tomorrow at 2pm",
    "yes",
];

/// Wednesday 2026-10-14, 11:00 in Toronto.
pub fn call_time() -> DateTime<Utc> {
    toronto(2026, 10, 14, 11, 0)
}

pub fn toronto(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Tz::America__Toronto
        .with_ymd_and_hms(y, m, d, h, min, 0)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn config(pairs: &[(&str, &str)]) -> Config {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|k| map.get(k).cloned()).unwrap()
}

pub struct Harness {
    pub flow: CallFlow,
    pub store: Arc<MemoryStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub clock: Arc<FixedClock>,
}

pub fn harness() -> Harness {
    harness_with(&[])
}

pub fn harness_with(pairs: &[(&str, &str)]) -> Harness {
    let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(Duration::from_secs(1_800)));
    let store = Arc::new(MemoryStore::new());
    harness_from(config(pairs), sessions, store.clone(), store)
}

pub fn harness_from(
    config: Config,
    sessions: Arc<dyn SessionStore>,
    bookings: Arc<dyn BookingStore>,
    store: Arc<MemoryStore>,
) -> Harness {
    let config = Arc::new(config);
    let clock = Arc::new(FixedClock::new(call_time()));
    let flow = CallFlow::new(
        config.clone(),
        sessions.clone(),
        CallerProfileResolver::new(store.clone()),
        BookingCoordinator::new(
            bookings,
            CalendarDispatcher::disabled(),
            config.name_update_policy,
        ),
        clock.clone(),
    );
    Harness {
        flow,
        store,
        sessions,
        clock,
    }
}

pub fn call_start(call_id: &str, from: Option<&str>) -> Turn {
    Turn {
        call_id: call_id.to_string(),
        caller_phone: from.map(str::to_string),
        ..Default::default()
    }
}

pub fn answer(call_id: &str, seq: u32, utterance: Option<&str>) -> Turn {
    Turn {
        call_id: call_id.to_string(),
        utterance: utterance.map(str::to_string),
        seq: Some(seq),
        ..Default::default()
    }
}

pub fn seq_of(reply: &Reply) -> u32 {
    match reply.next {
        NextStep::Gather { seq } => seq,
        NextStep::Hangup => panic!("call already ended: {reply:?}"),
    }
}

/// Start a call and answer each prompt in turn.  Returns every reply, the greeting first.
pub async fn run_call(h: &Harness, call_id: &str, from: Option<&str>, utterances: &[&str]) -> Vec<Reply> {
    let mut replies = vec![h.flow.handle_turn(call_start(call_id, from)).await];
    for u in utterances {
        let seq = seq_of(replies.last().unwrap());
        replies.push(h.flow.handle_turn(answer(call_id, seq, Some(u))).await);
    }
    replies
}
