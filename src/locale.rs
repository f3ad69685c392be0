use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use std::sync::Mutex;

/// Source of "now" for a turn.  Time extraction and session timestamps read from here so that
/// tests can pin the call time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.0.lock() {
            *guard = now;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.0.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Opening hours of the business, interpreted in `tz`.
#[derive(Clone, Debug)]
pub struct BusinessHours {
    pub tz: Tz,
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub days: Vec<Weekday>,
}

impl BusinessHours {
    pub fn is_open_on(&self, date: NaiveDate) -> bool {
        self.days.contains(&date.weekday())
    }

    /// Whether `[starts_at, starts_at + minutes)` falls entirely inside one open day.
    pub fn contains(&self, starts_at: DateTime<Utc>, minutes: u32) -> bool {
        let local_start = starts_at.with_timezone(&self.tz);
        let local_end = (starts_at + chrono::Duration::minutes(i64::from(minutes)))
            .with_timezone(&self.tz);
        if local_start.date_naive() != local_end.date_naive() {
            return false;
        }
        self.is_open_on(local_start.date_naive())
            && local_start.time() >= self.open
            && local_end.time() <= self.close
    }
}

/// Everything the extractors need to know about where and when the call is happening.
#[derive(Clone, Debug)]
pub struct CallLocale {
    /// Zone the caller speaks in; "3pm" means 3pm here.
    pub tz: Tz,
    pub country_code: String,
    pub now: DateTime<Utc>,
}

impl CallLocale {
    pub fn today(&self) -> NaiveDate {
        self.now.with_timezone(&self.tz).date_naive()
    }

    /// Resolve a wall-clock time in the caller's zone.  Nonexistent local times (spring-forward
    /// gaps) resolve to `None`; ambiguous ones take the earlier instant.
    pub fn resolve(&self, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Tz>> {
        self.tz.from_local_datetime(&date.and_time(time)).earliest()
    }
}

/// Parse a comma-separated list of three-letter weekday names.
pub fn parse_weekdays(raw: &str) -> Option<Vec<Weekday>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Weekday>().ok())
        .collect()
}

// Largest-metro zone for each North American area code we route.  Anything not listed falls back
// to the business timezone.
const AREA_CODE_ZONES: &[(&str, Tz)] = &[
    // Ontario / Quebec / Eastern
    ("416", Tz::America__Toronto),
    ("647", Tz::America__Toronto),
    ("437", Tz::America__Toronto),
    ("905", Tz::America__Toronto),
    ("289", Tz::America__Toronto),
    ("365", Tz::America__Toronto),
    ("613", Tz::America__Toronto),
    ("343", Tz::America__Toronto),
    ("519", Tz::America__Toronto),
    ("226", Tz::America__Toronto),
    ("705", Tz::America__Toronto),
    ("514", Tz::America__Toronto),
    ("438", Tz::America__Toronto),
    ("212", Tz::America__New_York),
    ("646", Tz::America__New_York),
    ("718", Tz::America__New_York),
    ("917", Tz::America__New_York),
    ("617", Tz::America__New_York),
    ("202", Tz::America__New_York),
    ("305", Tz::America__New_York),
    ("404", Tz::America__New_York),
    ("215", Tz::America__New_York),
    ("313", Tz::America__Detroit),
    // Atlantic
    ("902", Tz::America__Halifax),
    ("506", Tz::America__Halifax),
    ("709", Tz::America__St_Johns),
    // Central
    ("312", Tz::America__Chicago),
    ("773", Tz::America__Chicago),
    ("214", Tz::America__Chicago),
    ("713", Tz::America__Chicago),
    ("512", Tz::America__Chicago),
    ("612", Tz::America__Chicago),
    ("204", Tz::America__Winnipeg),
    ("306", Tz::America__Regina),
    // Mountain
    ("403", Tz::America__Edmonton),
    ("587", Tz::America__Edmonton),
    ("780", Tz::America__Edmonton),
    ("303", Tz::America__Denver),
    ("801", Tz::America__Denver),
    ("602", Tz::America__Phoenix),
    ("480", Tz::America__Phoenix),
    // Pacific
    ("604", Tz::America__Vancouver),
    ("778", Tz::America__Vancouver),
    ("250", Tz::America__Vancouver),
    ("206", Tz::America__Los_Angeles),
    ("213", Tz::America__Los_Angeles),
    ("310", Tz::America__Los_Angeles),
    ("415", Tz::America__Los_Angeles),
    ("503", Tz::America__Los_Angeles),
    ("702", Tz::America__Los_Angeles),
    ("808", Tz::Pacific__Honolulu),
    ("907", Tz::America__Anchorage),
];

/// Timezone implied by an E.164 NANP number's area code.
pub fn zone_for_phone(e164: &str) -> Option<Tz> {
    let national = e164.strip_prefix("+1")?;
    if national.len() != 10 {
        return None;
    }
    let area = &national[..3];
    AREA_CODE_ZONES
        .iter()
        .find(|(code, _)| *code == area)
        .map(|(_, tz)| *tz)
}
