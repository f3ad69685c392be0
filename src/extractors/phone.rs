use super::{digit_word, tokenize, Reason};

const E164_MAX_DIGITS: usize = 15;
const INTL_MIN_DIGITS: usize = 8;

/// Pull a phone number out of a spoken utterance and normalize it to E.164.
///
/// Digits may arrive as numerals, digit words, or a mix, broken up by separators and filler
/// ("four one six... uh five five five..."). "oh" counts as zero once a number has started;
/// "double"/"triple" repeat the next digit. `country_code` is the default region used when the
/// caller does not say "plus".
pub fn extract_phone(utterance: &str, country_code: &str) -> Result<String, Reason> {
    if utterance.trim().is_empty() {
        return Err(Reason::NoInput);
    }
    let tokens = tokenize(utterance);
    let mut digits = String::new();
    let mut international = utterance.trim_start().starts_with('+');
    let mut repeat = 1;

    for token in &tokens {
        match token.as_str() {
            "double" => {
                repeat = 2;
                continue;
            }
            "triple" => {
                repeat = 3;
                continue;
            }
            "plus" if digits.is_empty() => {
                international = true;
                continue;
            }
            "oh" | "o" if digits.is_empty() => continue,
            _ => {}
        }
        if let Some(d) = digit_word(token) {
            for _ in 0..repeat {
                digits.push(char::from(b'0' + d));
            }
            repeat = 1;
        } else if token.chars().any(|c| c.is_ascii_digit())
            && token.chars().all(|c| c.is_ascii_digit() || c == '-')
        {
            let mut numerals = token.chars().filter(char::is_ascii_digit);
            if let Some(first) = numerals.next() {
                for _ in 0..repeat {
                    digits.push(first);
                }
            }
            digits.extend(numerals);
            repeat = 1;
        }
        // Anything else is filler between digit groups.
    }

    if digits.is_empty() {
        return Err(Reason::Unparsable);
    }
    canonicalize(&digits, international, country_code)
}

/// Normalize an already-textual number (caller ID, stored value) to E.164.
pub fn normalize_e164(raw: &str, country_code: &str) -> Result<String, Reason> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Reason::NoInput);
    }
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(Reason::Unparsable);
    }
    canonicalize(&digits, trimmed.starts_with('+'), country_code)
}

fn canonicalize(digits: &str, international: bool, country_code: &str) -> Result<String, Reason> {
    if international {
        return international_number(digits);
    }
    if let Some(rest) = digits.strip_prefix("011") {
        if digits.len() > 11 {
            return international_number(rest);
        }
    }
    if country_code == "1" {
        return match digits.len() {
            n if n < 10 => Err(Reason::TooShort),
            10 => nanp(digits),
            11 if digits.starts_with('1') => nanp(&digits[1..]),
            _ => Err(Reason::TooLong),
        };
    }
    let national = digits.strip_prefix('0').unwrap_or(digits);
    let total = country_code.len() + national.len();
    if total < INTL_MIN_DIGITS {
        Err(Reason::TooShort)
    } else if total > E164_MAX_DIGITS {
        Err(Reason::TooLong)
    } else {
        Ok(format!("+{country_code}{national}"))
    }
}

fn international_number(digits: &str) -> Result<String, Reason> {
    if let Some(national) = digits.strip_prefix('1') {
        return match national.len() {
            n if n < 10 => Err(Reason::TooShort),
            10 => nanp(national),
            _ => Err(Reason::TooLong),
        };
    }
    if digits.starts_with('0') {
        return Err(Reason::InvalidFormat);
    }
    match digits.len() {
        n if n < INTL_MIN_DIGITS => Err(Reason::TooShort),
        n if n > E164_MAX_DIGITS => Err(Reason::TooLong),
        _ => Ok(format!("+{digits}")),
    }
}

/// North American numbering plan: NXX-NXX-XXXX, and the area code is not a service code (N11).
fn nanp(ten: &str) -> Result<String, Reason> {
    let b = ten.as_bytes();
    let plausible = (b'2'..=b'9').contains(&b[0])
        && !(b[1] == b'1' && b[2] == b'1')
        && (b'2'..=b'9').contains(&b[3]);
    if plausible {
        Ok(format!("+1{ten}"))
    } else {
        Err(Reason::InvalidFormat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phone(s: &str) -> Result<String, Reason> {
        extract_phone(s, "1")
    }

    #[test]
    fn spoken_digits_normalize() {
        assert_eq!(
            phone("four one six five five five one two three four").as_deref(),
            Ok("+14165551234")
        );
    }

    #[test]
    fn split_by_filler_and_pauses() {
        assert_eq!(
            phone("four one six... uh five five five... um one two three four").as_deref(),
            Ok("+14165551234")
        );
        assert_eq!(
            phone("my number is 416, 555, 12 34").as_deref(),
            Ok("+14165551234")
        );
    }

    #[test]
    fn separators_and_country_prefix() {
        assert_eq!(phone("(416) 555-1234").as_deref(), Ok("+14165551234"));
        assert_eq!(phone("1-416-555-1234").as_deref(), Ok("+14165551234"));
        assert_eq!(phone("+1 416 555 1234").as_deref(), Ok("+14165551234"));
    }

    #[test]
    fn oh_is_zero_inside_a_number() {
        assert_eq!(
            phone("oh it's four one six five five five oh one two three").as_deref(),
            Ok("+14165550123")
        );
    }

    #[test]
    fn double_and_triple() {
        assert_eq!(
            phone("four one six triple five one two three four").as_deref(),
            Ok("+14165551234")
        );
        assert_eq!(
            phone("four one six double 5 5 1234").as_deref(),
            Ok("+14165551234")
        );
    }

    #[test]
    fn short_numbers_fail_without_padding() {
        assert_eq!(phone("123"), Err(Reason::TooShort));
        assert_eq!(phone("five five five one two three four"), Err(Reason::TooShort));
    }

    #[test]
    fn long_numbers_fail_without_truncating() {
        assert_eq!(phone("416 555 1234 999"), Err(Reason::TooLong));
    }

    #[test]
    fn implausible_prefixes_fail() {
        assert_eq!(phone("116 555 1234"), Err(Reason::InvalidFormat));
        assert_eq!(phone("911 555 1234"), Err(Reason::InvalidFormat));
        assert_eq!(phone("416 155 1234"), Err(Reason::InvalidFormat));
    }

    #[test]
    fn international_numbers() {
        assert_eq!(
            phone("plus four four two zero seven one two three four five six seven").as_deref(),
            Ok("+442071234567")
        );
        assert_eq!(phone("011 44 20 7123 4567").as_deref(), Ok("+442071234567"));
        assert_eq!(
            extract_phone("020 7123 4567", "44").as_deref(),
            Ok("+442071234567")
        );
    }

    #[test]
    fn no_digits() {
        assert_eq!(phone(""), Err(Reason::NoInput));
        assert_eq!(phone("I don't know it"), Err(Reason::Unparsable));
    }

    #[test]
    fn caller_id_normalization() {
        assert_eq!(normalize_e164("+14165551234", "1").as_deref(), Ok("+14165551234"));
        assert_eq!(normalize_e164("416.555.1234", "1").as_deref(), Ok("+14165551234"));
        assert_eq!(normalize_e164("anonymous", "1"), Err(Reason::Unparsable));
    }
}
