use super::tokenize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Affirm,
    Deny,
    Unclear,
}

const AFFIRM: &[&str] = &[
    "yes", "yeah", "yep", "yup", "yea", "sure", "correct", "right", "ok", "okay", "confirm",
    "absolutely", "perfect", "great", "definitely", "please", "affirmative",
];
const DENY: &[&str] = &[
    "no", "nope", "nah", "wrong", "incorrect", "change", "different", "another", "negative",
];
const NEGATORS: &[&str] = &["not", "don't", "isn't", "doesn't", "wait"];

/// Constrained yes/no reading of the caller's answer to the confirmation question.  Any
/// negation wins over affirmative words ("yes, no wait, that's wrong" is a deny).
pub fn classify_confirmation(utterance: &str) -> Confirmation {
    let tokens = tokenize(utterance);
    if tokens.is_empty() {
        return Confirmation::Unclear;
    }
    let denies = tokens
        .iter()
        .any(|t| DENY.contains(&t.as_str()) || NEGATORS.contains(&t.as_str()));
    if denies {
        return Confirmation::Deny;
    }
    let joined = tokens.join(" ");
    let affirms = tokens.iter().any(|t| AFFIRM.contains(&t.as_str()))
        || joined.contains("sounds good")
        || joined.contains("go ahead")
        || joined.contains("book it");
    if affirms {
        Confirmation::Affirm
    } else {
        Confirmation::Unclear
    }
}
