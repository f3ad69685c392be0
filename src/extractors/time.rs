use super::{digit_word, tokenize, Reason};
use crate::locale::{BusinessHours, CallLocale};

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc, Weekday};

const MIN_DURATION: u32 = 5;
const MAX_DURATION: u32 = 480;

/// Inputs the time extractor resolves an utterance against.
pub struct TimeRequest<'a> {
    pub locale: &'a CallLocale,
    pub hours: &'a BusinessHours,
    pub default_minutes: u32,
    pub horizon_days: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeSlot {
    pub starts_at: DateTime<FixedOffset>,
    pub duration_minutes: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Meridiem {
    Am,
    Pm,
}

#[derive(Debug)]
struct ClockTime {
    hour: u32,
    minute: u32,
    meridiem: Option<Meridiem>,
    /// Written unambiguously on a 24-hour clock ("14:00", "09:30", "noon").
    exact: bool,
}

/// Parse a requested appointment time, anchored in the caller's timezone.
///
/// A stated hour without am/pm is tried both ways. Only interpretations that are in the future,
/// within the booking horizon, and inside business hours survive; exactly one must remain. When
/// no day is given, the nearest day with any surviving interpretation is used.
pub fn extract_time(utterance: &str, req: &TimeRequest) -> Result<TimeSlot, Reason> {
    if utterance.trim().is_empty() {
        return Err(Reason::NoInput);
    }
    let mut tokens = tokenize(utterance);
    let minutes = take_duration(&mut tokens)?.unwrap_or(req.default_minutes);
    let today = req.locale.today();
    let date = take_date(&mut tokens, today)?;
    let day_part = day_part(&tokens);

    let mut clock = match take_clock(&tokens) {
        Some(clock) => clock,
        None if date.is_some() || day_part.is_some() => return Err(Reason::Ambiguous),
        None => return Err(Reason::Unparsable),
    };
    if clock.meridiem.is_none() && !clock.exact {
        clock.meridiem = day_part;
    }
    let times = candidate_times(&clock).ok_or(Reason::Unparsable)?;

    if let Some(date) = date {
        return pick(req, today, date, &times, minutes);
    }
    for offset in 0..=req.horizon_days {
        let Some(day) = today.checked_add_signed(Duration::days(offset)) else {
            break;
        };
        match pick(req, today, day, &times, minutes) {
            Ok(slot) => return Ok(slot),
            Err(Reason::Ambiguous) => return Err(Reason::Ambiguous),
            Err(_) => continue,
        }
    }
    Err(Reason::OutOfHours)
}

fn pick(
    req: &TimeRequest,
    today: NaiveDate,
    date: NaiveDate,
    times: &[NaiveTime],
    minutes: u32,
) -> Result<TimeSlot, Reason> {
    if date < today {
        return Err(Reason::InPast);
    }
    if date.signed_duration_since(today).num_days() > req.horizon_days {
        return Err(Reason::TooFar);
    }
    let mut any_future = false;
    let mut valid = Vec::new();
    for time in times {
        let Some(local) = req.locale.resolve(date, *time) else {
            continue;
        };
        let utc = local.with_timezone(&Utc);
        if utc <= req.locale.now {
            continue;
        }
        any_future = true;
        if req.hours.contains(utc, minutes) {
            valid.push(local.with_timezone(&local.offset().fix()));
        }
    }
    match valid.as_slice() {
        [] if any_future => Err(Reason::OutOfHours),
        [] => Err(Reason::InPast),
        [starts_at] => Ok(TimeSlot {
            starts_at: *starts_at,
            duration_minutes: minutes,
        }),
        _ => Err(Reason::Ambiguous),
    }
}

fn candidate_times(clock: &ClockTime) -> Option<Vec<NaiveTime>> {
    let at = |h: u32| NaiveTime::from_hms_opt(h, clock.minute, 0);
    if clock.exact {
        return at(clock.hour).map(|t| vec![t]);
    }
    if !(1..=12).contains(&clock.hour) {
        return None;
    }
    let base = clock.hour % 12;
    match clock.meridiem {
        Some(Meridiem::Am) => at(base).map(|t| vec![t]),
        Some(Meridiem::Pm) => at(base + 12).map(|t| vec![t]),
        None => Some(vec![at(base)?, at(base + 12)?]),
    }
}

/// Remove a "for 45 minutes" / "for an hour" phrase and return its length in minutes.
fn take_duration(tokens: &mut Vec<String>) -> Result<Option<u32>, Reason> {
    for i in 0..tokens.len() {
        if tokens[i] != "for" {
            continue;
        }
        let rest: Vec<&str> = tokens[i + 1..].iter().map(String::as_str).collect();
        let matched = match rest.as_slice() {
            ["an" | "a" | "one", "hour", "and", "a", "half", ..] => Some((90, 5)),
            ["an" | "a" | "one", "hour", ..] => Some((60, 2)),
            ["half", "an", "hour", ..] => Some((30, 3)),
            _ => parse_number(tokens, i + 1).and_then(|(n, used)| {
                match tokens.get(i + 1 + used).map(String::as_str) {
                    Some("minutes" | "minute" | "mins" | "min") => Some((n, used + 1)),
                    Some("hours" | "hour") => Some((n * 60, used + 1)),
                    _ => None,
                }
            }),
        };
        if let Some((minutes, used)) = matched {
            if !(MIN_DURATION..=MAX_DURATION).contains(&minutes) {
                return Err(Reason::Unparsable);
            }
            tokens.drain(i..=i + used);
            return Ok(Some(minutes));
        }
    }
    Ok(None)
}

/// Remove the date expression, if any, and resolve it against `today`.
fn take_date(tokens: &mut Vec<String>, today: NaiveDate) -> Result<Option<NaiveDate>, Reason> {
    for i in 0..tokens.len() {
        let word = tokens[i].as_str();
        let next = tokens.get(i + 1).map(String::as_str);
        let next2 = tokens.get(i + 2).map(String::as_str);

        if word == "day" && next == Some("after") && next2 == Some("tomorrow") {
            tokens.drain(i..i + 3);
            return Ok(Some(today + Duration::days(2)));
        }
        let relative = match word {
            "today" => Some(0),
            "tonight" => Some(0),
            "tomorrow" => Some(1),
            "yesterday" => Some(-1),
            _ => None,
        };
        if let Some(days) = relative {
            if word != "tonight" {
                tokens.remove(i);
            }
            return Ok(Some(today + Duration::days(days)));
        }
        if let Ok(date) = NaiveDate::parse_from_str(word, "%Y-%m-%d") {
            tokens.remove(i);
            return Ok(Some(date));
        }
        if let Some(weekday) = parse_weekday(word) {
            let target = i64::from(weekday.num_days_from_monday());
            let from_monday = i64::from(today.weekday().num_days_from_monday());
            let mut delta = (target - from_monday).rem_euclid(7);
            let start = match i.checked_sub(1).map(|p| tokens[p].as_str()) {
                // "next friday" is the friday of the following week
                Some("next") => {
                    delta = 7 - from_monday + target;
                    i - 1
                }
                Some("this" | "on") => i - 1,
                _ => i,
            };
            tokens.drain(start..=i);
            return Ok(Some(today + Duration::days(delta)));
        }
        if let Some(month) = parse_month(word) {
            // "october 20th", "october the 20th", "the 20th of october"
            let after = if next == Some("the") { i + 2 } else { i + 1 };
            if let Some((day, used)) = parse_day(tokens, after, true) {
                tokens.drain(i..after + used);
                return month_day(today, month, day).map(Some);
            }
            if i >= 2 && tokens[i - 1] == "of" {
                let found = [3, 2].iter().filter_map(|back| i.checked_sub(*back)).find_map(|start| {
                    parse_day(tokens, start, false)
                        .filter(|(_, used)| start + used == i - 1)
                        .map(|(day, _)| (start, day))
                });
                if let Some((start, day)) = found {
                    tokens.drain(start..=i);
                    return month_day(today, month, day).map(Some);
                }
            }
        }
        if word == "the" {
            if let Some((day, used)) = parse_day(tokens, i + 1, false) {
                let of_month = match tokens.get(i + 1 + used).map(String::as_str) {
                    Some("of") => tokens.get(i + 2 + used).and_then(|t| parse_month(t)),
                    _ => None,
                };
                if let Some(month) = of_month {
                    tokens.drain(i..=i + 2 + used);
                    return month_day(today, month, day).map(Some);
                }
                tokens.drain(i..=i + used);
                let this_month = if day >= today.day() {
                    NaiveDate::from_ymd_opt(today.year(), today.month(), day)
                } else {
                    let (y, m) = if today.month() == 12 {
                        (today.year() + 1, 1)
                    } else {
                        (today.year(), today.month() + 1)
                    };
                    NaiveDate::from_ymd_opt(y, m, day)
                };
                return this_month.map(Some).ok_or(Reason::Unparsable);
            }
        }
    }
    Ok(None)
}

fn month_day(today: NaiveDate, month: u32, day: u32) -> Result<NaiveDate, Reason> {
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day).ok_or(Reason::Unparsable)?;
    if this_year >= today {
        return Ok(this_year);
    }
    NaiveDate::from_ymd_opt(today.year() + 1, month, day).ok_or(Reason::Unparsable)
}

fn day_part(tokens: &[String]) -> Option<Meridiem> {
    tokens.iter().find_map(|t| match t.as_str() {
        "morning" => Some(Meridiem::Am),
        "afternoon" | "evening" | "tonight" => Some(Meridiem::Pm),
        _ => None,
    })
}

fn take_clock(tokens: &[String]) -> Option<ClockTime> {
    for i in 0..tokens.len() {
        let word = tokens[i].as_str();
        let next = tokens.get(i + 1).map(String::as_str);
        match word {
            "noon" | "midday" => return Some(exact(12, 0)),
            "midnight" => return Some(exact(0, 0)),
            "half" | "quarter" if next == Some("past") || next == Some("after") => {
                let (hour, _) = parse_number(tokens, i + 2)?;
                let minute = if word == "half" { 30 } else { 15 };
                return Some(twelve_hour(hour, minute, meridiem_at(tokens, i + 3).0));
            }
            "quarter" if matches!(next, Some("to" | "till" | "of")) => {
                let (hour, _) = parse_number(tokens, i + 2)?;
                let hour = if hour == 1 { 12 } else { hour.checked_sub(1)? };
                return Some(twelve_hour(hour, 45, meridiem_at(tokens, i + 3).0));
            }
            _ => {}
        }
        if word.starts_with(|c: char| c.is_ascii_digit()) {
            if let Some(clock) = numeric_clock(tokens, i) {
                return Some(clock);
            }
            continue;
        }
        if let Some(clock) = spoken_clock(tokens, i) {
            return Some(clock);
        }
    }
    None
}

/// "2pm", "2:30 pm", "14:00", "2 30 p.m.", "230pm".
fn numeric_clock(tokens: &[String], i: usize) -> Option<ClockTime> {
    let word = tokens[i].as_str();
    let (core, mut meridiem) = match word.strip_suffix("am") {
        Some(core) => (core, Some(Meridiem::Am)),
        None => match word.strip_suffix("pm") {
            Some(core) => (core, Some(Meridiem::Pm)),
            None => (word, None),
        },
    };
    let mut used = 1;
    let (hour, minute, leading_zero) = if let Some((h, m)) = core.split_once(':') {
        (h.parse::<u32>().ok()?, m.parse::<u32>().ok()?, h.len() == 2 && h.starts_with('0'))
    } else if !core.is_empty() && core.len() <= 2 && core.chars().all(|c| c.is_ascii_digit()) {
        let hour = core.parse::<u32>().ok()?;
        let minute = match tokens.get(i + 1) {
            Some(m) if m.len() == 2 && m.chars().all(|c| c.is_ascii_digit()) => {
                used += 1;
                m.parse::<u32>().ok()?
            }
            _ => 0,
        };
        (hour, minute, false)
    } else if meridiem.is_some()
        && (3..=4).contains(&core.len())
        && core.chars().all(|c| c.is_ascii_digit())
    {
        let (h, m) = core.split_at(core.len() - 2);
        (h.parse::<u32>().ok()?, m.parse::<u32>().ok()?, false)
    } else {
        return None;
    };
    if meridiem.is_none() {
        meridiem = meridiem_at(tokens, i + used).0;
    }
    if hour > 23 || minute > 59 {
        return None;
    }
    if hour == 0 || hour > 12 || leading_zero {
        return Some(exact(hour, minute));
    }
    Some(twelve_hour(hour, minute, meridiem))
}

/// "three", "three thirty", "two oh five pm", "ten o'clock".  A bare number word only counts
/// as a time after "at"/"around" or when it is the whole answer.
fn spoken_clock(tokens: &[String], i: usize) -> Option<ClockTime> {
    let (hour, used) = parse_number(tokens, i)?;
    if !(1..=12).contains(&hour) {
        return None;
    }
    let mut j = i + used;
    let mut minute = None;
    match tokens.get(j).map(String::as_str) {
        Some("o'clock") => {
            minute = Some(0);
            j += 1;
        }
        Some("oh" | "o") => {
            let m = tokens.get(j + 1).and_then(|t| digit_word(t))?;
            minute = Some(u32::from(m));
            j += 2;
        }
        _ => {
            if let Some((m, used)) = parse_number(tokens, j) {
                if (10..=59).contains(&m) {
                    minute = Some(m);
                    j += used;
                }
            }
        }
    }
    let (meridiem, _) = meridiem_at(tokens, j);
    let anchored = matches!(
        i.checked_sub(1).map(|p| tokens[p].as_str()),
        Some("at" | "around" | "about" | "by")
    );
    if minute.is_none() && meridiem.is_none() && !anchored && tokens.len() > used {
        return None;
    }
    Some(twelve_hour(hour, minute.unwrap_or(0), meridiem))
}

fn meridiem_at(tokens: &[String], j: usize) -> (Option<Meridiem>, usize) {
    let word = tokens.get(j).map(String::as_str);
    let next = tokens.get(j + 1).map(String::as_str);
    match (word, next) {
        (Some("am"), _) => (Some(Meridiem::Am), 1),
        (Some("pm"), _) => (Some(Meridiem::Pm), 1),
        (Some("a"), Some("m")) => (Some(Meridiem::Am), 2),
        (Some("p"), Some("m")) => (Some(Meridiem::Pm), 2),
        _ => (None, 0),
    }
}

fn exact(hour: u32, minute: u32) -> ClockTime {
    ClockTime {
        hour,
        minute,
        meridiem: None,
        exact: true,
    }
}

fn twelve_hour(hour: u32, minute: u32, meridiem: Option<Meridiem>) -> ClockTime {
    ClockTime {
        hour,
        minute,
        meridiem,
        exact: false,
    }
}

/// Cardinal number from digits or words, up to fifty-nine.  Returns the value and tokens used.
fn parse_number(tokens: &[String], i: usize) -> Option<(u32, usize)> {
    let word = tokens.get(i)?.as_str();
    if !word.is_empty() && word.len() <= 3 && word.chars().all(|c| c.is_ascii_digit()) {
        return word.parse().ok().map(|n| (n, 1));
    }
    if let Some((tens, unit)) = word.split_once('-') {
        return Some((tens_word(tens)? + unit_word(unit).filter(|u| *u < 10)?, 1));
    }
    if let Some(tens) = tens_word(word) {
        if let Some(unit) = tokens.get(i + 1).and_then(|t| unit_word(t)).filter(|u| *u < 10) {
            return Some((tens + unit, 2));
        }
        return Some((tens, 1));
    }
    unit_word(word).map(|n| (n, 1))
}

fn unit_word(word: &str) -> Option<u32> {
    if let Some(d) = digit_word(word).filter(|_| !matches!(word, "oh" | "o" | "zero")) {
        return Some(u32::from(d));
    }
    Some(match word {
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "thirteen" => 13,
        "fourteen" => 14,
        "fifteen" => 15,
        "sixteen" => 16,
        "seventeen" => 17,
        "eighteen" => 18,
        "nineteen" => 19,
        _ => return None,
    })
}

fn tens_word(word: &str) -> Option<u32> {
    Some(match word {
        "twenty" => 20,
        "thirty" => 30,
        "forty" => 40,
        "fifty" => 50,
        "sixty" => 60,
        "ninety" => 90,
        _ => return None,
    })
}

/// Day of month: "20", "20th", "twentieth", "twenty first", "twenty-first".  Bare numerals are
/// only accepted when `allow_bare` (right after a month name).
fn parse_day(tokens: &[String], i: usize, allow_bare: bool) -> Option<(u32, usize)> {
    let word = tokens.get(i)?.as_str();
    let numeric = ["st", "nd", "rd", "th"]
        .iter()
        .find_map(|suffix| word.strip_suffix(suffix))
        .filter(|core| !core.is_empty() && core.chars().all(|c| c.is_ascii_digit()));
    let (day, used) = if let Some(core) = numeric {
        (core.parse().ok()?, 1)
    } else if allow_bare && word.len() <= 2 && word.chars().all(|c| c.is_ascii_digit()) {
        (word.parse().ok()?, 1)
    } else if let Some(day) = ordinal_word(word) {
        (day, 1)
    } else if let Some((tens, unit)) = word.split_once('-') {
        (tens_word(tens)? + ordinal_word(unit).filter(|u| *u < 10)?, 1)
    } else {
        let tens = tens_word(word)?;
        let unit = tokens.get(i + 1).and_then(|t| ordinal_word(t)).filter(|u| *u < 10)?;
        (tens + unit, 2)
    };
    (1..=31).contains(&day).then_some((day, used))
}

fn ordinal_word(word: &str) -> Option<u32> {
    Some(match word {
        "first" => 1,
        "second" => 2,
        "third" => 3,
        "fourth" => 4,
        "fifth" => 5,
        "sixth" => 6,
        "seventh" => 7,
        "eighth" => 8,
        "ninth" => 9,
        "tenth" => 10,
        "eleventh" => 11,
        "twelfth" => 12,
        "thirteenth" => 13,
        "fourteenth" => 14,
        "fifteenth" => 15,
        "sixteenth" => 16,
        "seventeenth" => 17,
        "eighteenth" => 18,
        "nineteenth" => 19,
        "twentieth" => 20,
        "thirtieth" => 30,
        _ => return None,
    })
}

fn parse_weekday(word: &str) -> Option<Weekday> {
    Some(match word {
        "monday" | "mon" => Weekday::Mon,
        "tuesday" | "tues" | "tue" => Weekday::Tue,
        "wednesday" | "wed" => Weekday::Wed,
        "thursday" | "thurs" | "thu" => Weekday::Thu,
        "friday" | "fri" => Weekday::Fri,
        "saturday" => Weekday::Sat,
        "sunday" => Weekday::Sun,
        _ => return None,
    })
}

fn parse_month(word: &str) -> Option<u32> {
    Some(match word {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" => 6,
        "july" => 7,
        "august" | "aug" => 8,
        "september" | "sept" | "sep" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Tz;

    // Wednesday 2026-10-14, 11:00 in Toronto.
    fn locale() -> CallLocale {
        CallLocale {
            tz: Tz::America__Toronto,
            country_code: "1".to_string(),
            now: Tz::America__Toronto
                .with_ymd_and_hms(2026, 10, 14, 11, 0, 0)
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    fn hours(open: u32, close: u32) -> BusinessHours {
        BusinessHours {
            tz: Tz::America__Toronto,
            open: NaiveTime::from_hms_opt(open, 0, 0).unwrap(),
            close: NaiveTime::from_hms_opt(close, 0, 0).unwrap(),
            days: vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
        }
    }

    fn parse_with(s: &str, hours: &BusinessHours) -> Result<TimeSlot, Reason> {
        let locale = locale();
        let req = TimeRequest {
            locale: &locale,
            hours,
            default_minutes: 30,
            horizon_days: 60,
        };
        extract_time(s, &req)
    }

    fn parse(s: &str) -> Result<TimeSlot, Reason> {
        parse_with(s, &hours(9, 17))
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        let local = Tz::America__Toronto.with_ymd_and_hms(y, m, d, h, min, 0).unwrap();
        local.with_timezone(&local.offset().fix())
    }

    #[test]
    fn relative_day_with_meridiem() {
        let slot = parse("tomorrow at 2pm").unwrap();
        assert_eq!(slot.starts_at, at(2026, 10, 15, 14, 0));
        assert_eq!(slot.starts_at.offset().local_minus_utc(), -4 * 3600);
        assert_eq!(slot.duration_minutes, 30);
    }

    #[test]
    fn bare_hour_prefers_business_hours() {
        assert_eq!(parse("tomorrow at 2").unwrap().starts_at, at(2026, 10, 15, 14, 0));
        assert_eq!(parse("at 3").unwrap().starts_at, at(2026, 10, 14, 15, 0));
    }

    #[test]
    fn dateless_time_rolls_to_next_open_day() {
        // 10am today has passed, 10pm is closed
        assert_eq!(parse("at 10").unwrap().starts_at, at(2026, 10, 15, 10, 0));
    }

    #[test]
    fn genuine_ambiguity_is_rejected() {
        let long_day = hours(7, 21);
        assert_eq!(parse_with("tomorrow at 8", &long_day), Err(Reason::Ambiguous));
        assert_eq!(
            parse_with("tomorrow at 8 in the morning", &long_day).unwrap().starts_at,
            at(2026, 10, 15, 8, 0)
        );
        assert_eq!(parse("tomorrow"), Err(Reason::Ambiguous));
    }

    #[test]
    fn out_of_hours_and_past() {
        assert_eq!(parse("tomorrow at 7pm"), Err(Reason::OutOfHours));
        assert_eq!(parse("saturday at 10am"), Err(Reason::OutOfHours));
        assert_eq!(parse("today at 9am"), Err(Reason::InPast));
        assert_eq!(parse("yesterday at 2pm"), Err(Reason::InPast));
        assert_eq!(parse("tomorrow at 4:45 pm"), Err(Reason::OutOfHours));
    }

    #[test]
    fn weekdays_and_calendar_dates() {
        assert_eq!(
            parse("next monday at 10:30 am").unwrap().starts_at,
            at(2026, 10, 19, 10, 30)
        );
        assert_eq!(
            parse("friday at three thirty in the afternoon").unwrap().starts_at,
            at(2026, 10, 16, 15, 30)
        );
        assert_eq!(
            parse("October 20th at 10 a.m.").unwrap().starts_at,
            at(2026, 10, 20, 10, 0)
        );
        assert_eq!(
            parse("the twenty first of october at noon").unwrap().starts_at,
            at(2026, 10, 21, 12, 0)
        );
        assert_eq!(parse("the 20th at 10am").unwrap().starts_at, at(2026, 10, 20, 10, 0));
        assert_eq!(parse("2026-10-20 14:00").unwrap().starts_at, at(2026, 10, 20, 14, 0));
    }

    #[test]
    fn next_weekday_means_the_following_week() {
        assert_eq!(parse("friday at 10am").unwrap().starts_at, at(2026, 10, 16, 10, 0));
        assert_eq!(parse("next friday at 10am").unwrap().starts_at, at(2026, 10, 23, 10, 0));
        assert_eq!(parse("this friday at 10am").unwrap().starts_at, at(2026, 10, 16, 10, 0));
        assert_eq!(parse("next wednesday at 10am").unwrap().starts_at, at(2026, 10, 21, 10, 0));
    }

    #[test]
    fn non_ascii_tokens_do_not_split_mid_char() {
        assert!(parse("tomorrow at 3é4pm").is_err());
        assert!(parse("tomorrow at é30pm").is_err());
        assert!(parse("à 3h").is_err());
    }

    #[test]
    fn zone_offset_follows_dst() {
        // Toronto leaves daylight time on 2026-11-01.
        let slot = parse("november 2nd at 9am").unwrap();
        assert_eq!(slot.starts_at.offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn beyond_horizon() {
        assert_eq!(parse("march 3rd at noon"), Err(Reason::TooFar));
    }

    #[test]
    fn spoken_clock_forms() {
        assert_eq!(
            parse("half past two tomorrow afternoon").unwrap().starts_at,
            at(2026, 10, 15, 14, 30)
        );
        assert_eq!(parse("two thirty tomorrow").unwrap().starts_at, at(2026, 10, 15, 14, 30));
        assert_eq!(
            parse("tomorrow quarter to eleven").unwrap().starts_at,
            at(2026, 10, 15, 10, 45)
        );
        assert_eq!(
            parse("tomorrow at ten o'clock").unwrap().starts_at,
            at(2026, 10, 15, 10, 0)
        );
    }

    #[test]
    fn duration_phrase() {
        let slot = parse("tomorrow at 2pm for 45 minutes").unwrap();
        assert_eq!(slot.duration_minutes, 45);
        let slot = parse("tomorrow at 2pm for an hour").unwrap();
        assert_eq!(slot.duration_minutes, 60);
        assert_eq!(parse("tomorrow at 9am for nine hours"), Err(Reason::Unparsable));
    }

    #[test]
    fn nothing_usable() {
        assert_eq!(parse(""), Err(Reason::NoInput));
        assert_eq!(parse("sometime next week"), Err(Reason::Unparsable));
    }
}
