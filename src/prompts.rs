//! What the caller hears.  Wording depends on the state, on why the last utterance failed, and
//! on how many times the caller has already been asked.

use crate::consts::{APP_GREETING, CALL_ENDED, CANCELLED, RETRY_LATER};
use crate::extractors::Reason;
use crate::types::{CallState, Slot, Slots};

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use chrono_tz::Tz;

pub fn spoken_time<T: TimeZone>(t: &DateTime<T>) -> String
where
    T::Offset: std::fmt::Display,
{
    if t.format("%M").to_string() == "00" {
        t.format("%A, %B %-d at %-I %p").to_string()
    } else {
        t.format("%A, %B %-d at %-I:%M %p").to_string()
    }
}

/// Digits read one at a time in NANP groups, so text-to-speech does not say "four billion".
pub fn spoken_phone(e164: &str) -> String {
    let digits: Vec<char> = e164.chars().filter(char::is_ascii_digit).collect();
    let national: &[char] = if digits.len() == 11 && digits[0] == '1' {
        &digits[1..]
    } else {
        &digits
    };
    let spaced = |chunk: &[char]| {
        chunk
            .iter()
            .map(char::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    };
    if national.len() == 10 {
        format!(
            "{}, {}, {}",
            spaced(&national[..3]),
            spaced(&national[3..6]),
            spaced(&national[6..])
        )
    } else {
        spaced(national)
    }
}

fn first_name(full_name: &str) -> &str {
    full_name.split_whitespace().next().unwrap_or(full_name)
}

pub fn greeting_new() -> String {
    format!("{APP_GREETING} May I have your full name, please?")
}

pub fn greeting_returning(full_name: &str, last: Option<DateTime<Utc>>, tz: Tz) -> String {
    let mut out = format!("Welcome back, {}.", first_name(full_name));
    if let Some(last) = last {
        out.push_str(&format!(
            " Your last appointment was {}.",
            spoken_time(&last.with_timezone(&tz))
        ));
    }
    out.push_str(" What day and time would you like to come in?");
    out
}

/// The first time a state asks for its slot.
pub fn ask(state: CallState, slots: &Slots) -> String {
    match state {
        CallState::Entry | CallState::CollectName => {
            "May I have your full name, please?".to_string()
        }
        CallState::CollectPhone => match &slots.name {
            Some(name) => format!(
                "Thanks, {}. What is the best phone number to reach you?",
                first_name(name)
            ),
            None => "What is the best phone number to reach you?".to_string(),
        },
        CallState::CollectTime => "What day and time would you like to come in?".to_string(),
        CallState::Confirm => confirm(slots),
        CallState::Booked => "Your appointment is booked. Goodbye.".to_string(),
        CallState::DuplicateRejected => {
            "You already have an appointment at that time, and it is still booked. Goodbye."
                .to_string()
        }
        CallState::Abandoned => CANCELLED.to_string(),
    }
}

pub fn confirm(slots: &Slots) -> String {
    match (&slots.name, &slots.phone, &slots.starts_at) {
        (Some(name), Some(phone), Some(starts_at)) => format!(
            "Let me confirm. {} at {}, on {}. Shall I book it?",
            name,
            spoken_phone(phone),
            spoken_time(starts_at)
        ),
        _ => "Shall I book the appointment?".to_string(),
    }
}

/// After a failed extraction.  `attempt` is the number of failures so far on this slot.
pub fn reprompt(slot: Slot, reason: Reason, attempt: u32, slots: &Slots) -> String {
    let lead = match reason {
        Reason::NoInput => "Sorry, I didn't hear anything.",
        Reason::TooShort if slot == Slot::Phone => "That number seems to be missing some digits.",
        Reason::TooLong => "That number has too many digits.",
        Reason::InvalidFormat => "That doesn't look like a valid phone number.",
        Reason::LooksLikeNumber => "That sounded like a number rather than a name.",
        Reason::TooShort | Reason::LowConfidence => "Sorry, I didn't quite catch your name.",
        Reason::Ambiguous => "I want to make sure I get the time right.",
        Reason::OutOfHours => "We're not open then.",
        Reason::InPast => "That time has already passed.",
        Reason::TooFar => "We can only book a couple of months ahead.",
        Reason::Unparsable => "Sorry, I didn't understand that time.",
        Reason::Unclear => "Sorry, I need a yes or a no.",
    };
    let ask = match (slot, attempt) {
        (Slot::Name, 1) => "Could you tell me your full name?".to_string(),
        (Slot::Name, _) => "Please say your first and last name, for example, Jane Doe.".to_string(),
        (Slot::Phone, 1) => "What is your phone number?".to_string(),
        (Slot::Phone, _) => {
            "Please say your ten digit phone number one digit at a time, starting with the area code."
                .to_string()
        }
        (Slot::Time, _) if reason == Reason::Ambiguous => {
            "Did you mean in the morning or the afternoon? Please say the time with A M or P M."
                .to_string()
        }
        (Slot::Time, 1) => "What day and time would you like?".to_string(),
        (Slot::Time, _) => {
            "Please say a weekday and a time during business hours, for example, tomorrow at 2 PM."
                .to_string()
        }
        (Slot::Confirm, _) => confirm(slots),
    };
    format!("{lead} {ask}")
}

pub fn booked(starts_at: &DateTime<FixedOffset>) -> String {
    format!(
        "You're all set for {}. We'll see you then. Goodbye.",
        spoken_time(starts_at)
    )
}

pub fn duplicate<T: TimeZone>(existing: &DateTime<T>) -> String
where
    T::Offset: std::fmt::Display,
{
    format!(
        "You already have an appointment on {}, and it is still booked. Goodbye.",
        spoken_time(existing)
    )
}

pub fn time_rejected_on_confirm() -> String {
    "No problem. What day and time would you like instead?".to_string()
}

pub fn booking_contended(slots: &Slots) -> String {
    format!(
        "Sorry, I couldn't save that just now. {}",
        confirm(slots)
    )
}

pub fn abandoned() -> String {
    "I'm sorry, I'm having trouble understanding. Please call back when it's convenient. Goodbye."
        .to_string()
}

pub fn cancelled() -> String {
    CANCELLED.to_string()
}

pub fn call_ended() -> String {
    CALL_ENDED.to_string()
}

pub fn retry_later() -> String {
    RETRY_LATER.to_string()
}
