use serde::{Deserialize, Serialize};

/// A work interval
///
/// `end_ts = None` means the work is still in progress. Timestamps are
/// Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkRecord {
    pub id: i64,
    pub project_id: i64,
    pub start_ts: i64,
    pub end_ts: Option<i64>,
}

impl WorkRecord {
    /// Whether `ts` falls strictly inside this record
    ///
    /// An open record covers every instant after its start. No record
    /// covers its own start instant.
    pub fn covers(&self, ts: i64) -> bool {
        match self.end_ts {
            Some(end) => self.start_ts < ts && end > ts,
            None => self.start_ts < ts,
        }
    }

    /// Seconds of this record inside `[from, to)`, counting open records
    /// up to `now`
    pub fn seconds_within(&self, from: i64, to: i64, now: i64) -> i64 {
        let end = self.end_ts.unwrap_or(now);
        let lo = self.start_ts.max(from);
        let hi = end.min(to);
        (hi - lo).max(0)
    }
}

/// A record to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub project_id: i64,
    pub start_ts: i64,
    pub end_ts: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(start: i64, end: Option<i64>) -> WorkRecord {
        WorkRecord {
            id: 1,
            project_id: 1,
            start_ts: start,
            end_ts: end,
        }
    }

    #[test]
    fn test_covers_excludes_boundaries() {
        let closed = record(100, Some(200));
        assert!(!closed.covers(100));
        assert!(closed.covers(101));
        assert!(closed.covers(199));
        assert!(!closed.covers(200));
    }

    #[test]
    fn test_open_record_covers_everything_after_start() {
        let open = record(100, None);
        assert!(!open.covers(100));
        assert!(open.covers(1_000_000));
    }

    #[test]
    fn test_seconds_within_clips() {
        let closed = record(100, Some(200));
        assert_eq!(closed.seconds_within(0, 1000, 5000), 100);
        assert_eq!(closed.seconds_within(150, 1000, 5000), 50);
        assert_eq!(closed.seconds_within(300, 1000, 5000), 0);

        let open = record(100, None);
        assert_eq!(open.seconds_within(0, 1000, 400), 300);
    }
}
