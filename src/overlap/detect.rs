use std::collections::BTreeSet;

use crate::models::WorkRecord;

/// Records overlapping instant `at`
///
/// A record overlaps `t` when it started strictly before `t` and has not
/// ended by `t`. Open records overlap every later instant. No instant means
/// no overlap.
pub fn find_overlapping(records: &[WorkRecord], at: Option<i64>) -> Vec<&WorkRecord> {
    match at {
        Some(t) => records.iter().filter(|r| r.covers(t)).collect(),
        None => Vec::new(),
    }
}

/// Existing records that clash with a proposed interval
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conflicts {
    /// Records running across the proposed start
    pub at_start: Vec<WorkRecord>,
    /// Records running across the proposed end
    pub at_end: Vec<WorkRecord>,
    /// Records starting inside the proposed interval
    pub enclosed: Vec<WorkRecord>,
}

impl Conflicts {
    /// Classify `snapshot` against `[start, end)`, an open interval when
    /// `end` is `None`. The record with id `exclude` is ignored.
    pub fn detect(snapshot: &[WorkRecord], start: i64, end: Option<i64>, exclude: Option<i64>) -> Self {
        let candidates: Vec<WorkRecord> = snapshot
            .iter()
            .filter(|r| Some(r.id) != exclude)
            .cloned()
            .collect();

        let at_start = find_overlapping(&candidates, Some(start))
            .into_iter()
            .cloned()
            .collect();
        let at_end = find_overlapping(&candidates, end)
            .into_iter()
            .cloned()
            .collect();
        let enclosed = candidates
            .iter()
            .filter(|r| r.start_ts >= start && end.map_or(true, |e| r.start_ts < e))
            .cloned()
            .collect();

        Self {
            at_start,
            at_end,
            enclosed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.at_start.is_empty() && self.at_end.is_empty() && self.enclosed.is_empty()
    }

    /// Every conflicting record once, ordered by start
    pub fn all(&self) -> Vec<WorkRecord> {
        let mut seen = BTreeSet::new();
        let mut records: Vec<WorkRecord> = self
            .at_start
            .iter()
            .chain(&self.at_end)
            .chain(&self.enclosed)
            .filter(|r| seen.insert(r.id))
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.start_ts, r.id));
        records
    }

    /// Records crossing the start or end boundary, which can be closed at
    /// the new start
    pub fn crossing(&self) -> Vec<WorkRecord> {
        let enclosed: BTreeSet<i64> = self.enclosed.iter().map(|r| r.id).collect();
        self.all()
            .into_iter()
            .filter(|r| !enclosed.contains(&r.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: i64, start: i64, end: Option<i64>) -> WorkRecord {
        WorkRecord {
            id,
            project_id: 1,
            start_ts: start,
            end_ts: end,
        }
    }

    #[test]
    fn test_start_boundary_is_exclusive() {
        let records = vec![rec(1, 1000, Some(2000))];
        assert!(find_overlapping(&records, Some(1000)).is_empty());
        assert_eq!(find_overlapping(&records, Some(1001)).len(), 1);
        assert!(find_overlapping(&records, Some(2000)).is_empty());
        assert!(find_overlapping(&records, None).is_empty());
    }

    #[test]
    fn test_open_record_overlaps_later_instants() {
        let records = vec![rec(1, 1000, None)];
        assert!(find_overlapping(&records, Some(999)).is_empty());
        assert_eq!(find_overlapping(&records, Some(1_000_000)).len(), 1);
    }

    #[test]
    fn test_detect_classifies() {
        let snapshot = vec![
            rec(1, 0, Some(100)),
            rec(2, 150, Some(180)),
            rec(3, 190, None),
        ];
        let conflicts = Conflicts::detect(&snapshot, 50, Some(200), None);
        assert_eq!(conflicts.at_start, vec![rec(1, 0, Some(100))]);
        assert_eq!(conflicts.at_end, vec![rec(3, 190, None)]);
        assert_eq!(conflicts.enclosed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(conflicts.all().iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(conflicts.crossing().iter().map(|r| r.id).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_detect_excludes_self() {
        let snapshot = vec![rec(7, 0, Some(100))];
        assert!(Conflicts::detect(&snapshot, 10, Some(90), Some(7)).is_empty());
        assert!(!Conflicts::detect(&snapshot, 10, Some(90), None).is_empty());
    }

    #[test]
    fn test_adjacent_records_do_not_conflict() {
        let snapshot = vec![rec(1, 0, Some(100))];
        assert!(Conflicts::detect(&snapshot, 100, Some(200), None).is_empty());
    }
}
