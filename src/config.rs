use crate::error::AppError;
use crate::extractors::normalize_e164;
use crate::locale::{parse_weekdays, BusinessHours};

use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// What to do with the stored name when a returning caller gives a different one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameUpdatePolicy {
    Overwrite,
    KeepOriginal,
}

impl FromStr for NameUpdatePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(NameUpdatePolicy::Overwrite),
            "keep" | "keep_original" => Ok(NameUpdatePolicy::KeepOriginal),
            other => Err(AppError::Config(format!(
                "NAME_UPDATE_POLICY must be overwrite or keep, got {other:?}"
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CalendarConfig {
    pub calendar_id: String,
    pub token: String,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub business_hours: BusinessHours,
    pub appointment_minutes: u32,
    pub booking_horizon_days: i64,
    pub max_attempts: u32,
    pub session_ttl: Duration,
    pub turn_budget: Duration,
    pub country_code: String,
    pub min_name_token_len: usize,
    pub name_update_policy: NameUpdatePolicy,
    /// E.164 caller IDs of test harness lines.
    pub test_caller_numbers: Vec<String>,
    pub test_data_retention: Option<chrono::Duration>,
    pub calendar: Option<CalendarConfig>,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let tz: Tz = parse_or(&get, "BUSINESS_TIMEZONE", Tz::America__Toronto)?;
        let open = parse_time(&get, "BUSINESS_OPEN", "09:00")?;
        let close = parse_time(&get, "BUSINESS_CLOSE", "17:00")?;
        if close <= open {
            return Err(AppError::Config(
                "BUSINESS_CLOSE must be after BUSINESS_OPEN".to_string(),
            ));
        }
        let days = match get("BUSINESS_DAYS") {
            Some(raw) => parse_weekdays(&raw).ok_or_else(|| {
                AppError::Config(format!("BUSINESS_DAYS is not a weekday list: {raw:?}"))
            })?,
            None => vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        };

        let country_code: String = get("DEFAULT_COUNTRY_CODE").unwrap_or_else(|| "1".to_string());
        if country_code.is_empty() || !country_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::Config(format!(
                "DEFAULT_COUNTRY_CODE must be digits, got {country_code:?}"
            )));
        }

        let test_caller_numbers = get("TEST_CALLER_NUMBERS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| {
                        normalize_e164(s, &country_code).map_err(|reason| {
                            AppError::Config(format!("TEST_CALLER_NUMBERS entry {s:?}: {reason}"))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let calendar = match (get("GOOGLE_CALENDAR_ID"), get("GOOGLE_CALENDAR_TOKEN")) {
            (Some(calendar_id), Some(token)) => Some(CalendarConfig {
                calendar_id,
                token,
                max_retries: parse_or(&get, "CALENDAR_MAX_RETRIES", 5)?,
            }),
            (None, None) => None,
            _ => {
                return Err(AppError::Config(
                    "GOOGLE_CALENDAR_ID and GOOGLE_CALENDAR_TOKEN must be set together"
                        .to_string(),
                ))
            }
        };

        let max_attempts: u32 = parse_or(&get, "MAX_ATTEMPTS", 3)?;
        if max_attempts == 0 {
            return Err(AppError::Config("MAX_ATTEMPTS must be at least 1".to_string()));
        }

        Ok(Self {
            listen_addr: parse_or(&get, "LISTEN_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            database_url: get("DATABASE_URL"),
            database_max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 5)?,
            business_hours: BusinessHours {
                tz,
                open,
                close,
                days,
            },
            appointment_minutes: parse_or(&get, "APPOINTMENT_MINUTES", 30)?,
            booking_horizon_days: parse_or(&get, "BOOKING_HORIZON_DAYS", 60)?,
            max_attempts,
            session_ttl: Duration::from_secs(parse_or(&get, "SESSION_TTL_SECS", 1_800)?),
            turn_budget: Duration::from_millis(parse_or(&get, "TURN_BUDGET_MILLIS", 8_000)?),
            country_code,
            min_name_token_len: parse_or(&get, "MIN_NAME_TOKEN_LEN", 3)?,
            name_update_policy: parse_or(&get, "NAME_UPDATE_POLICY", NameUpdatePolicy::Overwrite)?,
            test_caller_numbers,
            test_data_retention: get("TEST_DATA_RETENTION_HOURS")
                .map(|raw| {
                    raw.trim().parse::<i64>().map(chrono::Duration::hours).map_err(|e| {
                        AppError::Config(format!("TEST_DATA_RETENTION_HOURS: {e}"))
                    })
                })
                .transpose()?,
            calendar,
            log_level: parse_or(&get, "LOG_LEVEL", tracing::Level::DEBUG)?,
        })
    }

    pub fn is_test_caller(&self, e164: &str) -> bool {
        self.test_caller_numbers.iter().any(|n| n == e164)
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::Config(format!("{key}: {e}"))),
        None => Ok(default),
    }
}

fn parse_time(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<NaiveTime, AppError> {
    let raw = get(key).unwrap_or_else(|| default.to_string());
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|e| AppError::Config(format!("{key}: {e}")))
}
