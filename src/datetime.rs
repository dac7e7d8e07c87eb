//! Timezone-aware datetime normalization.
//!
//! Every conversion in this module resolves into the service timezone, read
//! once from the `TZ` environment variable and falling back to
//! [`DEFAULT_TIMEZONE`]. Timestamps at or above [`MILLIS_THRESHOLD`] are
//! treated as milliseconds, smaller ones as seconds, so callers never have to
//! know which unit an upstream system used.

use std::cmp::Ordering;
use std::env;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::{error, warn};

/// Timezone used when `TZ` is unset or unparseable.
pub const DEFAULT_TIMEZONE: Tz = Tz::Asia__Shanghai;

/// Numeric timestamps at or above this value are milliseconds.
pub const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

const MILLIS_THRESHOLD_F64: f64 = 1_000_000_000_000.0;

static SERVICE_TIMEZONE: OnceCell<Tz> = OnceCell::new();

/// Errors from datetime conversion.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DateTimeError {
    /// Numeric timestamp that is negative or not a finite number.
    #[error("invalid timestamp {0}: must be a positive number")]
    NonPositive(f64),
    /// Numeric timestamp outside the representable datetime range.
    #[error("timestamp {0} is out of range")]
    OutOfRange(i64),
    /// Text that matches no supported datetime format.
    #[error("unrecognized datetime string: {0}")]
    Unparseable(String),
}

/// A datetime-like value as it arrives from JSON bodies or upstream APIs.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeValue {
    /// Datetime carrying its own offset.
    Aware(DateTime<FixedOffset>),
    /// Datetime without an offset; interpreted in the service timezone.
    Naive(NaiveDateTime),
    /// Unix timestamp in seconds or milliseconds.
    Int(i64),
    /// Unix timestamp in seconds or milliseconds, with fraction.
    Float(f64),
    /// ISO 8601 text, or a number rendered as text.
    Text(String),
}

impl TimeValue {
    /// Lift a JSON value into a `TimeValue`.
    ///
    /// Strings and numbers convert; null, booleans, arrays, and objects do
    /// not.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(text) => Some(Self::Text(text.clone())),
            serde_json::Value::Number(number) => number
                .as_i64()
                .map(Self::Int)
                .or_else(|| number.as_f64().map(Self::Float)),
            serde_json::Value::Null
            | serde_json::Value::Bool(_)
            | serde_json::Value::Array(_)
            | serde_json::Value::Object(_) => None,
        }
    }
}

impl From<DateTime<Utc>> for TimeValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Aware(value.fixed_offset())
    }
}

impl From<DateTime<FixedOffset>> for TimeValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::Aware(value)
    }
}

impl From<DateTime<Tz>> for TimeValue {
    fn from(value: DateTime<Tz>) -> Self {
        Self::Aware(value.fixed_offset())
    }
}

impl From<NaiveDateTime> for TimeValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::Naive(value)
    }
}

impl From<i64> for TimeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for TimeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for TimeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for TimeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// The timezone all conversions resolve into.
///
/// Read from `TZ` on first use and cached for the lifetime of the process.
#[must_use]
pub fn service_timezone() -> Tz {
    *SERVICE_TIMEZONE.get_or_init(|| timezone_from(env::var("TZ").ok().as_deref()))
}

fn timezone_from(name: Option<&str>) -> Tz {
    match name {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Unknown timezone {raw}, falling back to {DEFAULT_TIMEZONE}");
            DEFAULT_TIMEZONE
        }),
        None => DEFAULT_TIMEZONE,
    }
}

/// Current time in the service timezone.
#[must_use]
pub fn now_with_timezone() -> DateTime<Tz> {
    Utc::now().with_timezone(&service_timezone())
}

/// Current time in the service timezone, as an ISO 8601 string.
#[must_use]
pub fn now_iso() -> String {
    now_with_timezone().to_rfc3339()
}

/// Normalize a datetime-like value to an ISO 8601 string in the service
/// timezone.
///
/// `None` and empty text normalize to `None`. Zero and negative numbers are
/// rejected; naive datetimes are interpreted in the service timezone.
pub fn to_iso_format(value: Option<&TimeValue>) -> Result<Option<String>, DateTimeError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let service = service_timezone();
    let resolved = match value {
        TimeValue::Text(text) => {
            if text.is_empty() {
                return Ok(None);
            }
            parse_text(text, service)?
        }
        TimeValue::Int(timestamp) => {
            if *timestamp <= 0 {
                return Err(DateTimeError::NonPositive(*timestamp as f64));
            }
            from_timestamp(*timestamp)?
        }
        TimeValue::Float(timestamp) => match timestamp.partial_cmp(&0.0) {
            Some(Ordering::Greater) => from_timestamp_f64(*timestamp)?,
            Some(Ordering::Equal | Ordering::Less) | None => {
                return Err(DateTimeError::NonPositive(*timestamp));
            }
        },
        TimeValue::Aware(aware) => aware.with_timezone(&service),
        TimeValue::Naive(naive) => localize(*naive, service),
    };
    Ok(Some(resolved.to_rfc3339()))
}

/// Convert a Unix timestamp to a datetime in the service timezone.
///
/// Values at or above [`MILLIS_THRESHOLD`] are read as milliseconds,
/// smaller ones as seconds.
pub fn from_timestamp(timestamp: i64) -> Result<DateTime<Tz>, DateTimeError> {
    let utc = if timestamp >= MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(timestamp)
    } else {
        DateTime::from_timestamp(timestamp, 0)
    }
    .ok_or(DateTimeError::OutOfRange(timestamp))?;
    Ok(utc.with_timezone(&service_timezone()))
}

/// Fractional variant of [`from_timestamp`], keeping microsecond precision.
pub fn from_timestamp_f64(timestamp: f64) -> Result<DateTime<Tz>, DateTimeError> {
    if !timestamp.is_finite() {
        return Err(DateTimeError::NonPositive(timestamp));
    }
    let seconds = if timestamp >= MILLIS_THRESHOLD_F64 {
        timestamp / 1000.0
    } else {
        timestamp
    };
    let micros = (seconds * 1_000_000.0) as i64;
    let utc = DateTime::from_timestamp_micros(micros).ok_or(DateTimeError::OutOfRange(micros))?;
    Ok(utc.with_timezone(&service_timezone()))
}

/// Unix timestamp of a datetime, in seconds.
#[must_use]
pub fn to_timestamp<T: TimeZone>(value: &DateTime<T>) -> i64 {
    value.timestamp()
}

/// Unix timestamp of a datetime, in milliseconds.
#[must_use]
pub fn to_timestamp_ms<T: TimeZone>(value: &DateTime<T>) -> i64 {
    value.timestamp_millis()
}

/// Best-effort conversion of any datetime-like value to a millisecond
/// timestamp.
///
/// Numbers and numeric text apply the seconds-vs-milliseconds heuristic.
/// Other text is parsed as a datetime, falling back to the current time when
/// it is unparseable. `None` and non-finite numbers yield 0.
#[must_use]
pub fn to_timestamp_ms_universal(value: Option<&TimeValue>) -> i64 {
    match value {
        None => 0,
        Some(TimeValue::Int(timestamp)) => {
            if *timestamp >= MILLIS_THRESHOLD {
                *timestamp
            } else {
                timestamp.saturating_mul(1000)
            }
        }
        Some(TimeValue::Float(timestamp)) => {
            if !timestamp.is_finite() {
                error!("Cannot convert {timestamp} to a millisecond timestamp");
                return 0;
            }
            if *timestamp >= MILLIS_THRESHOLD_F64 {
                *timestamp as i64
            } else {
                (*timestamp * 1000.0) as i64
            }
        }
        Some(TimeValue::Text(text)) => match text.parse::<f64>() {
            Ok(numeric) => to_timestamp_ms_universal(Some(&TimeValue::Float(numeric))),
            Err(_) => to_timestamp_ms(&from_iso_format(&TimeValue::Text(text.clone()), None)),
        },
        Some(TimeValue::Aware(aware)) => to_timestamp_ms(aware),
        Some(TimeValue::Naive(naive)) => to_timestamp_ms(&localize(*naive, service_timezone())),
    }
}

/// Parse a datetime-like value into a datetime in the service timezone.
///
/// Naive inputs are interpreted in `assumed_timezone` (the service timezone
/// when `None`) before conversion. Unparseable input falls back to the
/// current time so that callers always receive a usable datetime.
#[must_use]
pub fn from_iso_format(value: &TimeValue, assumed_timezone: Option<Tz>) -> DateTime<Tz> {
    let service = service_timezone();
    let assumed = assumed_timezone.unwrap_or(service);
    let parsed = match value {
        TimeValue::Aware(aware) => Ok(aware.with_timezone(&service)),
        TimeValue::Naive(naive) => Ok(localize(*naive, assumed).with_timezone(&service)),
        TimeValue::Text(text) => parse_text(text, assumed),
        TimeValue::Int(timestamp) => Err(DateTimeError::Unparseable(timestamp.to_string())),
        TimeValue::Float(timestamp) => Err(DateTimeError::Unparseable(timestamp.to_string())),
    };
    match parsed {
        Ok(resolved) => resolved,
        Err(cause) => {
            error!("Invalid datetime value, falling back to now: {cause}");
            now_with_timezone()
        }
    }
}

// Full precision first; the minute-only forms catch inputs like "2024-01-02T10:30"
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn parse_text(text: &str, assumed: Tz) -> Result<DateTime<Tz>, DateTimeError> {
    let service = service_timezone();
    if let Ok(aware) = DateTime::parse_from_rfc3339(text) {
        return Ok(aware.with_timezone(&service));
    }
    if let Ok(aware) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(aware.with_timezone(&service));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(localize(naive, assumed).with_timezone(&service));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        let midnight = date.and_time(NaiveTime::MIN);
        return Ok(localize(midnight, assumed).with_timezone(&service));
    }
    Err(DateTimeError::Unparseable(text.to_string()))
}

fn localize(naive: NaiveDateTime, timezone: Tz) -> DateTime<Tz> {
    timezone
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| timezone.from_utc_datetime(&naive))
}

#[cfg(test)]
#[path = "datetime_tests.rs"]
mod tests;
