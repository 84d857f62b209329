// Duration and offset parsing
//
// Offsets look like `+1w2d`, `-3h30m`; durations additionally accept
// clock syntax (`1:30`, `1:30:15`).

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use thiserror::Error;

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 3_600;
const SECS_PER_DAY: i64 = 86_400;
const SECS_PER_WEEK: i64 = 604_800;

/// Longest accepted span, about a century
pub const MAX_SPAN_SECONDS: i64 = 100 * 365 * SECS_PER_DAY;

/// Week/day/hour/minute/second components, matched in that fixed order.
static OFFSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)w)?(?:(\d+)d)?(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$").unwrap()
});

/// Hour/minute/second components only.
static HMS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$").unwrap());

/// Errors produced while reading time, duration and offset expressions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("invalid offset '{0}'")]
    InvalidOffset(String),

    #[error("invalid duration '{0}'")]
    InvalidDuration(String),

    #[error("negative duration '{0}' is not allowed")]
    NegativeDuration(String),

    #[error("unknown date format '{0}'")]
    UnknownFormat(String),

    #[error("invalid date '{0}'")]
    InvalidDate(String),

    #[error("invalid time '{0}'")]
    InvalidTime(String),

    #[error("'{0}' does not name a single local time")]
    AmbiguousLocalTime(String),

    #[error("'{0}' is out of range")]
    OutOfRange(String),
}

/// A signed span of time
///
/// The sign applies to the whole span. Components are kept as given so a
/// span can be shown back the way it was typed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Span {
    pub negative: bool,
    pub weeks: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl Span {
    /// Decompose a number of seconds into normalized components
    pub fn from_seconds(total: i64) -> Self {
        let negative = total < 0;
        let mut rest = total.unsigned_abs();
        let weeks = rest / SECS_PER_WEEK as u64;
        rest %= SECS_PER_WEEK as u64;
        let days = rest / SECS_PER_DAY as u64;
        rest %= SECS_PER_DAY as u64;
        let hours = rest / SECS_PER_HOUR as u64;
        rest %= SECS_PER_HOUR as u64;
        let minutes = rest / SECS_PER_MINUTE as u64;
        let seconds = rest % SECS_PER_MINUTE as u64;
        Self {
            negative,
            weeks: weeks.min(u32::MAX as u64) as u32,
            days: days as u32,
            hours: hours as u32,
            minutes: minutes as u32,
            seconds: seconds as u32,
        }
    }

    /// Signed length in seconds
    pub fn total_seconds(&self) -> i64 {
        let magnitude = self.weeks as i64 * SECS_PER_WEEK
            + self.days as i64 * SECS_PER_DAY
            + self.hours as i64 * SECS_PER_HOUR
            + self.minutes as i64 * SECS_PER_MINUTE
            + self.seconds as i64;
        if self.negative {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Signed number of whole calendar days (weeks folded in)
    pub fn calendar_days(&self) -> i64 {
        let days = self.weeks as i64 * 7 + self.days as i64;
        if self.negative {
            -days
        } else {
            days
        }
    }

    pub fn to_chrono(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.total_seconds())
    }
}

fn bounded(span: Span, text: &str) -> Result<Span, TimeParseError> {
    if span.total_seconds().abs() > MAX_SPAN_SECONDS {
        return Err(TimeParseError::OutOfRange(text.to_string()));
    }
    Ok(span)
}

fn split_sign(text: &str) -> (bool, &str) {
    if let Some(rest) = text.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = text.strip_prefix('+') {
        (false, rest)
    } else {
        (false, text)
    }
}

fn component(caps: &regex::Captures<'_>, idx: usize) -> Result<Option<u32>, ()> {
    caps.get(idx)
        .map(|m| m.as_str().parse::<u32>())
        .transpose()
        .map_err(|_| ())
}

/// Parse an offset such as `+1w3d`, `-2h`, `30m`
///
/// Returns the span and whether it was fine grained (an hour, minute or
/// second component was present).
pub fn parse_offset(text: &str) -> Result<(Span, bool), TimeParseError> {
    let invalid = || TimeParseError::InvalidOffset(text.to_string());
    let (negative, body) = split_sign(text);
    let caps = OFFSET_RE.captures(body).ok_or_else(invalid)?;

    let weeks = component(&caps, 1).map_err(|_| invalid())?;
    let days = component(&caps, 2).map_err(|_| invalid())?;
    let hours = component(&caps, 3).map_err(|_| invalid())?;
    let minutes = component(&caps, 4).map_err(|_| invalid())?;
    let seconds = component(&caps, 5).map_err(|_| invalid())?;

    if [weeks, days, hours, minutes, seconds].iter().all(Option::is_none) {
        return Err(invalid());
    }

    let fine_grained = hours.is_some() || minutes.is_some() || seconds.is_some();
    let span = Span {
        negative,
        weeks: weeks.unwrap_or(0),
        days: days.unwrap_or(0),
        hours: hours.unwrap_or(0),
        minutes: minutes.unwrap_or(0),
        seconds: seconds.unwrap_or(0),
    };
    Ok((bounded(span, text)?, fine_grained))
}

/// Split `2h30m5s` into hour/minute/second components
///
/// Returns `None` when the token is not duration shaped at all, so callers
/// can tell an omitted value from a zero one.
pub fn split_hms(text: &str) -> Option<[Option<u32>; 3]> {
    if !(text.contains('h') || text.contains('m') || text.contains('s')) {
        return None;
    }
    let caps = HMS_RE.captures(text)?;
    let hours = component(&caps, 1).ok()?;
    let minutes = component(&caps, 2).ok()?;
    let seconds = component(&caps, 3).ok()?;
    if hours.is_none() && minutes.is_none() && seconds.is_none() {
        return None;
    }
    Some([hours, minutes, seconds])
}

/// Parse a non-negative duration
///
/// Accepted forms: `1w3d`, `2h`, `1h30m`, `45s`, `1:30` (1h30m), `1:30:15`.
/// Clock syntax always reads the first field as hours.
pub fn parse_duration(text: &str) -> Result<Span, TimeParseError> {
    let invalid = || TimeParseError::InvalidDuration(text.to_string());
    let (negative, body) = split_sign(text);
    if negative {
        return Err(TimeParseError::NegativeDuration(text.to_string()));
    }

    if body.contains('w') || body.contains('d') {
        return match parse_offset(body) {
            Ok((span, _)) => Ok(span),
            Err(TimeParseError::OutOfRange(_)) => Err(TimeParseError::OutOfRange(text.to_string())),
            Err(_) => Err(invalid()),
        };
    }

    if body.contains(':') {
        let fields: Vec<&str> = body.split(':').collect();
        if fields.len() > 3 {
            return Err(invalid());
        }
        let mut values = [0u32; 3];
        for (slot, field) in values.iter_mut().zip(fields.iter()) {
            if field.is_empty() || !field.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            *slot = field.parse().map_err(|_| invalid())?;
        }
        if fields.len() < 2 {
            return Err(invalid());
        }
        let span = Span {
            hours: values[0],
            minutes: values[1],
            seconds: values[2],
            ..Span::default()
        };
        return bounded(span, text);
    }

    let [hours, minutes, seconds] = split_hms(body).ok_or_else(invalid)?;
    let span = Span {
        hours: hours.unwrap_or(0),
        minutes: minutes.unwrap_or(0),
        seconds: seconds.unwrap_or(0),
        ..Span::default()
    };
    bounded(span, text)
}
