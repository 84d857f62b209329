use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::window::Window;
use crate::hierarchy::ProjectTree;
use crate::models::WorkRecord;

/// Time spent on one project, including its descendants
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsRow {
    pub project_id: i64,
    pub path: String,
    pub depth: usize,
    pub seconds: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub rows: Vec<StatsRow>,
    /// Sum over all records, each counted once
    pub total_seconds: i64,
}

/// Compare strings treating digit runs as numbers (`p2` < `p10`)
///
/// Letters compare case-insensitively; case only breaks ties.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_cmp_folded(a, b).then_with(|| a.cmp(b))
}

fn natural_cmp_folded(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let ln = take_number(&mut left);
                let rn = take_number(&mut right);
                let trimmed_l = ln.trim_start_matches('0');
                let trimmed_r = rn.trim_start_matches('0');
                let ord = trimmed_l
                    .len()
                    .cmp(&trimmed_r.len())
                    .then_with(|| trimmed_l.cmp(trimmed_r))
                    .then_with(|| ln.len().cmp(&rn.len()));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                let ord = l.to_lowercase().cmp(r.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(c);
        chars.next();
    }
    digits
}

/// Per-project totals over `window`
///
/// Each record contributes only its part inside the window; open records
/// run until `now`. A project's total includes all of its descendants.
/// Projects with nothing recorded are left out.
pub fn compute_stats(tree: &ProjectTree, records: &[WorkRecord], window: &Window, now: i64) -> Stats {
    let (from, to) = (window.start_ts(), window.end_ts());

    let mut own: BTreeMap<i64, i64> = BTreeMap::new();
    let mut total_seconds = 0;
    for record in records {
        let secs = record.seconds_within(from, to, now);
        if secs > 0 {
            *own.entry(record.project_id).or_default() += secs;
            total_seconds += secs;
        }
    }

    let mut rows: Vec<StatsRow> = tree
        .by_id()
        .keys()
        .filter_map(|&id| {
            let seconds: i64 = tree
                .subtree(id)
                .iter()
                .filter_map(|member| own.get(member))
                .sum();
            (seconds > 0).then(|| StatsRow {
                project_id: id,
                path: tree.path(id).unwrap_or_default().to_string(),
                depth: tree.depth(id),
                seconds,
            })
        })
        .collect();
    rows.sort_by(|a, b| natural_cmp(&a.path, &b.path));

    Stats { rows, total_seconds }
}
