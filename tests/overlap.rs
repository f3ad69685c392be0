use chrono::{Duration, FixedOffset, TimeZone, Utc};
use proptest::prelude::*;
use std::sync::Arc;
use twilio_booking::booking::BookingCoordinator;
use twilio_booking::calendar::CalendarDispatcher;
use twilio_booking::config::NameUpdatePolicy;
use twilio_booking::db_types::AppointmentStatus;
use twilio_booking::storage::{BookingOutcome, BookingRequest, BookingStore, MemoryStore};
use twilio_booking::types::CallSession;

fn request(call_id: &str, phone: &str, start_min: i64, minutes: u32) -> BookingRequest {
    BookingRequest {
        call_id: call_id.to_string(),
        name: "Pat Doe".to_string(),
        phone: phone.to_string(),
        starts_at: Utc.with_ymd_and_hms(2026, 10, 15, 13, 0, 0).unwrap()
            + Duration::minutes(start_min),
        duration_minutes: minutes,
        is_test_data: false,
        name_policy: NameUpdatePolicy::Overwrite,
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    /// Two simultaneous bookings for one caller: both succeed only if the intervals are
    /// disjoint; otherwise exactly one survives and the other is a duplicate.
    #[test]
    fn concurrent_pair_for_one_caller(
        a_start in 0i64..32,
        a_len in 1u32..9,
        b_start in 0i64..32,
        b_len in 1u32..9,
    ) {
        let a = request("CA1", "+14165551234", a_start * 15, a_len * 15);
        let b = request("CA2", "+14165551234", b_start * 15, b_len * 15);
        let overlapping = a.starts_at < b.ends_at() && b.starts_at < a.ends_at();

        let store = Arc::new(MemoryStore::new());
        let (ra, rb) = runtime().block_on(async {
            let (sa, sb) = (store.clone(), store.clone());
            let ta = tokio::spawn(async move { sa.commit_booking(&a).await });
            let tb = tokio::spawn(async move { sb.commit_booking(&b).await });
            (ta.await.unwrap().unwrap(), tb.await.unwrap().unwrap())
        });

        let booked = [&ra, &rb]
            .iter()
            .filter(|r| matches!(r, BookingOutcome::Booked(_)))
            .count();
        let appointments = store.appointments().unwrap();
        if overlapping {
            prop_assert_eq!(booked, 1);
            prop_assert_eq!(appointments.len(), 1);
        } else {
            prop_assert_eq!(booked, 2);
            prop_assert_eq!(appointments.len(), 2);
        }
    }

    /// Whatever sequence of requests arrives, a caller's scheduled appointments never overlap,
    /// and other callers are never turned away because of them.
    #[test]
    fn scheduled_appointments_never_overlap(
        requests in prop::collection::vec((0usize..3, 0i64..32, 1u32..9), 1..12),
    ) {
        let phones = ["+14165551234", "+16045559876", "+12125550000"];
        let store = Arc::new(MemoryStore::new());
        let coordinator = BookingCoordinator::new(
            store.clone(),
            CalendarDispatcher::disabled(),
            NameUpdatePolicy::Overwrite,
        );

        runtime().block_on(async {
            let mut handles = Vec::new();
            for (i, (who, start, len)) in requests.iter().copied().enumerate() {
                let req = request(&format!("CA{i}"), phones[who], start * 15, len * 15);
                let mut session = CallSession::new(&req.call_id, None, false, Utc::now());
                session.slots.name = Some(req.name.clone());
                session.slots.phone = Some(req.phone.clone());
                session.slots.starts_at = Some(req.starts_at.with_timezone(&FixedOffset::east_opt(0).unwrap()));
                session.slots.duration_minutes = Some(req.duration_minutes);
                let coordinator = coordinator.clone();
                handles.push(tokio::spawn(async move { coordinator.book(&session).await }));
            }
            for handle in handles {
                assert!(handle.await.unwrap().is_ok());
            }
        });

        let appointments = store.appointments().unwrap();
        for (i, x) in appointments.iter().enumerate() {
            prop_assert_eq!(x.status, AppointmentStatus::Scheduled);
            for y in &appointments[i + 1..] {
                if x.user_id == y.user_id {
                    prop_assert!(!x.overlaps(y.starts_at, y.ends_at()), "{:?} overlaps {:?}", x, y);
                }
            }
        }
        let callers = requests.iter().map(|(who, _, _)| *who).collect::<std::collections::HashSet<_>>();
        let booked_callers = appointments.iter().map(|a| a.user_id).collect::<std::collections::HashSet<_>>();
        prop_assert_eq!(callers.len(), booked_callers.len());
    }
}
