//! Slot extractors.  Each one is a pure function from a transcribed utterance (plus whatever
//! locale it needs) to a validated value or a [`Reason`] it could not produce one.

pub mod confirm;
pub mod name;
pub mod phone;
pub mod time;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use confirm::{classify_confirmation, Confirmation};
pub use name::extract_name;
pub use phone::{extract_phone, normalize_e164};
pub use time::{extract_time, TimeRequest, TimeSlot};

/// Why an utterance did not yield a slot value.  The call flow picks re-prompt wording from this.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    NoInput,
    TooShort,
    TooLong,
    InvalidFormat,
    LooksLikeNumber,
    LowConfidence,
    Unparsable,
    Ambiguous,
    OutOfHours,
    InPast,
    TooFar,
    Unclear,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Reason::NoInput => "no_input",
            Reason::TooShort => "too_short",
            Reason::TooLong => "too_long",
            Reason::InvalidFormat => "invalid_format",
            Reason::LooksLikeNumber => "looks_like_number",
            Reason::LowConfidence => "low_confidence",
            Reason::Unparsable => "unparsable",
            Reason::Ambiguous => "ambiguous",
            Reason::OutOfHours => "out_of_hours",
            Reason::InPast => "in_past",
            Reason::TooFar => "too_far",
            Reason::Unclear => "unclear",
        };
        write!(f, "{s}")
    }
}

/// Lowercase the utterance and split it into word tokens.  Apostrophes, hyphens, colons and
/// digits survive; every other punctuation mark becomes a break.
pub(crate) fn tokenize(utterance: &str) -> Vec<String> {
    utterance
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '-' || c == ':'))
        .map(|t| t.trim_matches(|c: char| c == '\'' || c == '-'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Value of a spoken single digit, including the "oh" speech engines emit for zero.
pub(crate) fn digit_word(token: &str) -> Option<u8> {
    Some(match token {
        "zero" | "oh" | "o" => 0,
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        _ => return None,
    })
}

/// Words that speech engines scatter through utterances and which never carry slot content.
pub(crate) fn is_filler(token: &str) -> bool {
    matches!(
        token,
        "um" | "umm" | "uh" | "uhh" | "er" | "erm" | "ah" | "hmm" | "mm" | "like" | "so" | "well"
            | "okay" | "ok" | "yeah" | "yes" | "sure" | "actually" | "basically" | "right"
    )
}

/// Phrases that end the call from any collecting state.
pub fn is_cancel_request(utterance: &str) -> bool {
    let tokens = tokenize(utterance);
    let joined = tokens.join(" ");
    const PHRASES: &[&str] = &["never mind", "forget it", "hang up"];
    PHRASES.iter().any(|p| joined.contains(p))
        || tokens
            .iter()
            .any(|t| matches!(t.as_str(), "cancel" | "nevermind" | "goodbye" | "bye"))
}
