use super::{digit_word, is_filler, tokenize, Reason};

const LEAD_INS: &[&[&str]] = &[
    &["you", "can", "call", "me"],
    &["the", "name", "is"],
    &["my", "name", "is"],
    &["my", "name's"],
    &["name", "is"],
    &["name's"],
    &["this", "is"],
    &["it", "is"],
    &["it's"],
    &["its"],
    &["i", "am"],
    &["i'm"],
    &["im"],
    &["call", "me"],
    &["hi"],
    &["hello"],
    &["hey"],
];

const TRAILERS: &[&str] = &["here", "speaking", "please", "thanks", "thank", "you"];

const MAX_NAME_TOKENS: usize = 4;

/// Clean a caller's answer to "what is your name" down to a capitalized name.
///
/// A lone token shorter than `min_token_len` characters is too easy to mis-hear ("Al", "Ed",
/// or a stray syllable) and comes back as [`Reason::LowConfidence`] so the caller is asked again.
pub fn extract_name(utterance: &str, min_token_len: usize) -> Result<String, Reason> {
    if utterance.trim().is_empty() {
        return Err(Reason::NoInput);
    }
    let mut tokens: Vec<String> = tokenize(utterance)
        .into_iter()
        .filter(|t| !is_filler(t))
        .collect();

    if !tokens.is_empty() && tokens.iter().all(|t| is_numeric(t)) {
        return Err(Reason::LooksLikeNumber);
    }

    strip_lead_ins(&mut tokens);
    while tokens
        .last()
        .map_or(false, |t| TRAILERS.contains(&t.as_str()))
    {
        tokens.pop();
    }
    tokens.retain(|t| !t.chars().any(|c| c.is_ascii_digit()) && digit_word(t).is_none());
    let mut tokens = drop_false_starts(tokens);
    tokens.truncate(MAX_NAME_TOKENS);

    let letters: usize = tokens
        .iter()
        .map(|t| t.chars().filter(|c| c.is_alphabetic()).count())
        .sum();
    if letters < 2 {
        return Err(Reason::TooShort);
    }
    if tokens.len() == 1 && tokens[0].chars().count() < min_token_len {
        return Err(Reason::LowConfidence);
    }

    Ok(tokens
        .iter()
        .map(|t| capitalize(t))
        .collect::<Vec<_>>()
        .join(" "))
}

fn is_numeric(token: &str) -> bool {
    digit_word(token).is_some() || token.chars().all(|c| c.is_ascii_digit() || c == '-')
}

fn strip_lead_ins(tokens: &mut Vec<String>) {
    loop {
        let matched = LEAD_INS.iter().find(|phrase| {
            tokens.len() >= phrase.len()
                && phrase.iter().zip(tokens.iter()).all(|(p, t)| *p == t.as_str())
        });
        match matched {
            Some(phrase) => {
                tokens.drain(..phrase.len());
            }
            None => break,
        }
    }
}

/// "jo- john john smith" -> "john smith": repeated tokens and truncated restarts collapse into
/// the word the caller finished.
fn drop_false_starts(tokens: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        if out.last() == Some(token) {
            continue;
        }
        if let Some(next) = tokens.get(i + 1) {
            if next != token && next.starts_with(token.as_str()) {
                continue;
            }
        }
        out.push(token.clone());
    }
    out
}

fn capitalize(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut upper_next = true;
    for c in token.chars() {
        if upper_next {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        upper_next = c == '-' || c == '\'';
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Result<String, Reason> {
        extract_name(s, 3)
    }

    #[test]
    fn plain_name() {
        assert_eq!(name("John Smith").as_deref(), Ok("John Smith"));
        assert_eq!(name("john smith.").as_deref(), Ok("John Smith"));
    }

    #[test]
    fn lead_ins_and_fillers_are_stripped() {
        assert_eq!(name("my name is john smith").as_deref(), Ok("John Smith"));
        assert_eq!(name("Um, yeah, this is Priya").as_deref(), Ok("Priya"));
        assert_eq!(
            name("hi uh it's Mary-Jane O'Brien speaking").as_deref(),
            Ok("Mary-Jane O'Brien")
        );
    }

    #[test]
    fn false_starts_collapse() {
        assert_eq!(name("jo- john smith").as_deref(), Ok("John Smith"));
        assert_eq!(name("john john smith").as_deref(), Ok("John Smith"));
    }

    #[test]
    fn digits_are_not_names() {
        assert_eq!(name("4165551234"), Err(Reason::LooksLikeNumber));
        assert_eq!(name("four one six five five five"), Err(Reason::LooksLikeNumber));
    }

    #[test]
    fn empty_and_short() {
        assert_eq!(name("  "), Err(Reason::NoInput));
        assert_eq!(name("my name is"), Err(Reason::TooShort));
        assert_eq!(name("uh"), Err(Reason::TooShort));
        assert_eq!(name("a"), Err(Reason::TooShort));
    }

    #[test]
    fn short_single_token_is_low_confidence() {
        assert_eq!(name("Al"), Err(Reason::LowConfidence));
        assert_eq!(name("Al Smith").as_deref(), Ok("Al Smith"));
        assert_eq!(name("Bob").as_deref(), Ok("Bob"));
    }

    #[test]
    fn long_answers_are_capped() {
        assert_eq!(
            name("Juan Carlos de la Vega").as_deref(),
            Ok("Juan Carlos De La")
        );
    }
}
