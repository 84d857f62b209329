// Time expression parsing
//
// A time token is either an absolute local instant or a signed offset that
// is only resolved when the command runs.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};

use super::duration::{parse_offset, split_hms, Span, TimeParseError};

/// Value of a time option: absolute, or relative to a point chosen at use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSpec {
    Absolute(DateTime<Local>),
    Relative { span: Span, fine_grained: bool },
}

impl TimeSpec {
    /// Resolve against the current instant
    ///
    /// Fine-grained offsets move from `now`; day/week offsets move from the
    /// start of the current day.
    pub fn resolve(&self, now: DateTime<Local>) -> Result<DateTime<Local>, TimeParseError> {
        match *self {
            TimeSpec::Absolute(dt) => Ok(dt),
            TimeSpec::Relative { span, fine_grained: true } => now
                .checked_add_signed(span.to_chrono())
                .ok_or_else(|| TimeParseError::OutOfRange(describe(&span))),
            TimeSpec::Relative { span, fine_grained: false } => {
                let day = now
                    .date_naive()
                    .checked_add_signed(chrono::Duration::days(span.calendar_days()))
                    .ok_or_else(|| TimeParseError::OutOfRange(describe(&span)))?;
                local_midnight(day, &describe(&span))
            }
        }
    }

    /// Resolve with offsets anchored on `anchor` regardless of granularity
    ///
    /// Used when shifting a stored value (`edit id 3 from +15m`) or when an
    /// end is given relative to a record's own start.
    pub fn resolve_from(&self, anchor: DateTime<Local>) -> Result<DateTime<Local>, TimeParseError> {
        match *self {
            TimeSpec::Absolute(dt) => Ok(dt),
            TimeSpec::Relative { span, .. } => anchor
                .checked_add_signed(span.to_chrono())
                .ok_or_else(|| TimeParseError::OutOfRange(describe(&span))),
        }
    }
}

fn describe(span: &Span) -> String {
    format!("{}{}s", if span.negative { "-" } else { "+" }, span.total_seconds().abs())
}

/// Current local time truncated to whole seconds
pub fn now_seconds() -> DateTime<Local> {
    truncate_seconds(Local::now())
}

pub fn truncate_seconds(dt: DateTime<Local>) -> DateTime<Local> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

/// Convert a stored Unix timestamp back to local time
pub fn from_timestamp(ts: i64) -> Result<DateTime<Local>, TimeParseError> {
    chrono::Utc
        .timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.with_timezone(&Local))
        .ok_or_else(|| TimeParseError::OutOfRange(ts.to_string()))
}

/// Local midnight of the given date
pub fn local_midnight(day: NaiveDate, token: &str) -> Result<DateTime<Local>, TimeParseError> {
    local_datetime(day.and_time(NaiveTime::MIN), token)
}

/// Start of the day containing `dt`
pub fn start_of_day(dt: DateTime<Local>) -> Result<DateTime<Local>, TimeParseError> {
    local_midnight(dt.date_naive(), &dt.date_naive().to_string())
}

fn local_datetime(naive: NaiveDateTime, token: &str) -> Result<DateTime<Local>, TimeParseError> {
    Local
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| TimeParseError::AmbiguousLocalTime(token.to_string()))
}

fn parse_date(text: &str, token: &str) -> Result<NaiveDate, TimeParseError> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|_| TimeParseError::InvalidDate(token.to_string()))
}

/// Parse `H:MM`, `HH:MM` or `HH:MM:SS`, padding the hour to two digits
fn parse_clock(text: &str, token: &str) -> Result<NaiveTime, TimeParseError> {
    let padded = match text.split(':').next() {
        Some(hour) if hour.len() < 2 => format!("0{}", text),
        _ => text.to_string(),
    };
    NaiveTime::parse_from_str(&padded, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(&padded, "%H:%M"))
        .map_err(|_| TimeParseError::InvalidTime(token.to_string()))
}

/// Parse a time expression relative to the current instant
pub fn parse_time(text: &str) -> Result<TimeSpec, TimeParseError> {
    parse_time_at(text, now_seconds())
}

/// Parse a time expression
///
/// Resolution order:
/// - `now`
/// - leading `+`/`-`: an offset, kept relative
/// - `2024-03-01_9:30[:15]`: date and time
/// - `2024-03-01`: local midnight
/// - `9:30[:15]`: today at that time
/// - `8h30m`: today at 08:30:00
pub fn parse_time_at(text: &str, now: DateTime<Local>) -> Result<TimeSpec, TimeParseError> {
    if text == "now" {
        return Ok(TimeSpec::Absolute(truncate_seconds(now)));
    }

    if text.starts_with('+') || text.starts_with('-') {
        let (span, fine_grained) = parse_offset(text)?;
        return Ok(TimeSpec::Relative { span, fine_grained });
    }

    if let Some((date, clock)) = text.split_once('_') {
        let day = parse_date(date, text)?;
        let time = parse_clock(clock, text)?;
        return local_datetime(day.and_time(time), text).map(TimeSpec::Absolute);
    }

    if text.contains('-') {
        let day = parse_date(text, text)?;
        return local_midnight(day, text).map(TimeSpec::Absolute);
    }

    if text.contains(':') {
        let time = parse_clock(text, text)?;
        return local_datetime(now.date_naive().and_time(time), text).map(TimeSpec::Absolute);
    }

    if text.contains('h') || text.contains('m') || text.contains('s') {
        let [h, m, s] = split_hms(text).ok_or_else(|| TimeParseError::UnknownFormat(text.to_string()))?;
        let time = NaiveTime::from_hms_opt(h.unwrap_or(0), m.unwrap_or(0), s.unwrap_or(0))
            .ok_or_else(|| TimeParseError::InvalidTime(text.to_string()))?;
        return local_datetime(now.date_naive().and_time(time), text).map(TimeSpec::Absolute);
    }

    Err(TimeParseError::UnknownFormat(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, s).single().unwrap()
    }

    #[test]
    fn test_now_is_truncated() {
        let now = at(2024, 3, 12, 14, 5, 9);
        assert_eq!(parse_time_at("now", now).unwrap(), TimeSpec::Absolute(now));
    }

    #[test]
    fn test_absolute_forms() {
        let now = at(2024, 3, 12, 14, 5, 9);
        assert_eq!(
            parse_time_at("2020-04-09_9:10", now).unwrap(),
            TimeSpec::Absolute(at(2020, 4, 9, 9, 10, 0))
        );
        assert_eq!(
            parse_time_at("2020-04-09_09:10:30", now).unwrap(),
            TimeSpec::Absolute(at(2020, 4, 9, 9, 10, 30))
        );
        assert_eq!(
            parse_time_at("2020-04-09", now).unwrap(),
            TimeSpec::Absolute(at(2020, 4, 9, 0, 0, 0))
        );
        assert_eq!(
            parse_time_at("8:00", now).unwrap(),
            TimeSpec::Absolute(at(2024, 3, 12, 8, 0, 0))
        );
        assert_eq!(
            parse_time_at("8h30m", now).unwrap(),
            TimeSpec::Absolute(at(2024, 3, 12, 8, 30, 0))
        );
        assert_eq!(
            parse_time_at("45s", now).unwrap(),
            TimeSpec::Absolute(at(2024, 3, 12, 0, 0, 45))
        );
    }

    #[test]
    fn test_relative_forms_stay_unresolved() {
        let now = at(2024, 3, 12, 14, 5, 9);
        match parse_time_at("-1h", now).unwrap() {
            TimeSpec::Relative { span, fine_grained } => {
                assert!(fine_grained);
                assert_eq!(span.total_seconds(), -3600);
            }
            other => panic!("expected relative, got {:?}", other),
        }
        assert!(matches!(
            parse_time_at("+2d", now).unwrap(),
            TimeSpec::Relative { fine_grained: false, .. }
        ));
    }

    #[test]
    fn test_resolve_relative() {
        let now = at(2024, 3, 12, 14, 5, 9);
        let fine = parse_time_at("-1h", now).unwrap();
        assert_eq!(fine.resolve(now).unwrap(), at(2024, 3, 12, 13, 5, 9));

        let coarse = parse_time_at("-1d", now).unwrap();
        assert_eq!(coarse.resolve(now).unwrap(), at(2024, 3, 11, 0, 0, 0));

        let week = parse_time_at("+1w", now).unwrap();
        assert_eq!(week.resolve(now).unwrap(), at(2024, 3, 19, 0, 0, 0));

        let shifted = parse_time_at("+1d", now).unwrap();
        assert_eq!(shifted.resolve_from(now).unwrap(), at(2024, 3, 13, 14, 5, 9));
    }

    #[test]
    fn test_from_timestamp_range() {
        let dt = at(2024, 3, 12, 14, 5, 9);
        assert_eq!(from_timestamp(dt.timestamp()), Ok(dt));
        assert_eq!(
            from_timestamp(i64::MAX),
            Err(TimeParseError::OutOfRange(i64::MAX.to_string()))
        );
    }

    #[test]
    fn test_rejections() {
        let now = at(2024, 3, 12, 14, 5, 9);
        assert_eq!(
            parse_time_at("tomorrow", now),
            Err(TimeParseError::UnknownFormat("tomorrow".to_string()))
        );
        assert_eq!(
            parse_time_at("25:00", now),
            Err(TimeParseError::InvalidTime("25:00".to_string()))
        );
        assert_eq!(
            parse_time_at("2024-13-01", now),
            Err(TimeParseError::InvalidDate("2024-13-01".to_string()))
        );
        assert!(parse_time_at("-x", now).is_err());
        assert!(parse_time_at("1234", now).is_err());
    }
}
