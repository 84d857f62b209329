use chrono::{DateTime, Datelike, Duration, Local};
use serde::Serialize;

use crate::utils::date::{local_midnight, start_of_day};
use crate::utils::{Span, TimeParseError, TimeSpec};

/// Named reporting periods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Today,
    Yesterday,
    ThisWeek,
    LastWeek,
}

impl Shortcut {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "today" => Some(Shortcut::Today),
            "yesterday" => Some(Shortcut::Yesterday),
            "thisweek" => Some(Shortcut::ThisWeek),
            "lastweek" => Some(Shortcut::LastWeek),
            _ => None,
        }
    }
}

/// Window options as given on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowRequest {
    pub shortcut: Option<Shortcut>,
    pub from: Option<TimeSpec>,
    pub until: Option<TimeSpec>,
    pub span: Option<Span>,
}

/// Half-open reporting interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

impl Window {
    pub fn start_ts(&self) -> i64 {
        self.start.timestamp()
    }

    pub fn end_ts(&self) -> i64 {
        self.end.timestamp()
    }
}

fn days_from(day: DateTime<Local>, days: i64) -> Result<DateTime<Local>, TimeParseError> {
    let date = day
        .date_naive()
        .checked_add_signed(Duration::days(days))
        .ok_or_else(|| TimeParseError::OutOfRange(format!("{} days", days)))?;
    local_midnight(date, &date.to_string())
}

fn shortcut_window(shortcut: Shortcut, now: DateTime<Local>, week_days: u32) -> Result<Window, TimeParseError> {
    let today = start_of_day(now)?;
    let monday_offset = -(now.weekday().num_days_from_monday() as i64);
    let week = week_days as i64;
    let (start, end) = match shortcut {
        Shortcut::Today => (today, days_from(today, 1)?),
        Shortcut::Yesterday => (days_from(today, -1)?, today),
        Shortcut::ThisWeek => {
            let start = days_from(today, monday_offset)?;
            (start, days_from(start, week)?)
        }
        Shortcut::LastWeek => {
            let start = days_from(today, monday_offset - 7)?;
            (start, days_from(start, week)?)
        }
    };
    Ok(Window { start, end })
}

/// Turn window options into a concrete interval
///
/// A shortcut takes precedence over `from`. Without either, the window
/// starts at the beginning of this week. The end is `until` if given,
/// else start plus `for`, else now when `from` was given, else the end of
/// the week.
pub fn resolve_window(req: &WindowRequest, now: DateTime<Local>, week_days: u32) -> Result<Window, TimeParseError> {
    if let Some(shortcut) = req.shortcut {
        return shortcut_window(shortcut, now, week_days);
    }

    let week = shortcut_window(Shortcut::ThisWeek, now, week_days)?;
    let start = match &req.from {
        Some(spec) => spec.resolve(now)?,
        None => week.start,
    };

    let end = if let Some(spec) = &req.until {
        spec.resolve(now)?
    } else if let Some(span) = &req.span {
        start
            .checked_add_signed(span.to_chrono())
            .ok_or_else(|| TimeParseError::OutOfRange("for".to_string()))?
    } else if req.from.is_some() {
        now
    } else {
        week.end
    };

    Ok(Window { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{parse_duration, parse_time_at};
    use chrono::TimeZone;

    // Wednesday
    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 13, 15, 20, 0).single().unwrap()
    }

    fn day(d: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, d, 0, 0, 0).single().unwrap()
    }

    fn shortcut(s: Shortcut) -> WindowRequest {
        WindowRequest {
            shortcut: Some(s),
            ..WindowRequest::default()
        }
    }

    #[test]
    fn test_shortcuts() {
        let w = resolve_window(&shortcut(Shortcut::Today), now(), 5).unwrap();
        assert_eq!((w.start, w.end), (day(13), day(14)));

        let w = resolve_window(&shortcut(Shortcut::Yesterday), now(), 5).unwrap();
        assert_eq!((w.start, w.end), (day(12), day(13)));

        let w = resolve_window(&shortcut(Shortcut::ThisWeek), now(), 5).unwrap();
        assert_eq!((w.start, w.end), (day(11), day(16)));

        let w = resolve_window(&shortcut(Shortcut::LastWeek), now(), 7).unwrap();
        assert_eq!((w.start, w.end), (day(4), day(11)));
    }

    #[test]
    fn test_default_is_this_week() {
        let w = resolve_window(&WindowRequest::default(), now(), 5).unwrap();
        assert_eq!((w.start, w.end), (day(11), day(16)));
    }

    #[test]
    fn test_from_alone_ends_now() {
        let req = WindowRequest {
            from: Some(parse_time_at("-2d", now()).unwrap()),
            ..WindowRequest::default()
        };
        let w = resolve_window(&req, now(), 5).unwrap();
        assert_eq!((w.start, w.end), (day(11), now()));
    }

    #[test]
    fn test_from_with_for_and_until() {
        let from = parse_time_at("2024-03-01", now()).unwrap();
        let req = WindowRequest {
            from: Some(from),
            span: Some(parse_duration("1w").unwrap()),
            ..WindowRequest::default()
        };
        let w = resolve_window(&req, now(), 5).unwrap();
        assert_eq!((w.start, w.end), (day(1), day(8)));

        let req = WindowRequest {
            until: Some(parse_time_at("2024-03-03", now()).unwrap()),
            ..req
        };
        let w = resolve_window(&req, now(), 5).unwrap();
        assert_eq!(w.end, day(3));
    }

    #[test]
    fn test_shortcut_names() {
        assert_eq!(Shortcut::from_name("lastweek"), Some(Shortcut::LastWeek));
        assert_eq!(Shortcut::from_name("week"), None);
    }
}
