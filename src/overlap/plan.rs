use chrono::{DateTime, Local};
use thiserror::Error;

use super::detect::Conflicts;
use crate::models::{NewRecord, WorkRecord, UNASSIGNED_PROJECT_ID, UNASSIGNED_PROJECT_NAME};
use crate::utils::date::from_timestamp;
use crate::utils::{TimeParseError, TimeSpec};

/// Reasons a record change is refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlapError {
    #[error("{} record(s) overlap the requested interval, use force to end them at the new start", .0.len())]
    Conflict(Vec<WorkRecord>),

    #[error("{} record(s) start inside the requested interval and cannot be ended at its start", .0.len())]
    Enclosed(Vec<WorkRecord>),

    #[error("edit cancelled, {} record(s) overlap the new interval", .0.len())]
    EditConflict(Vec<WorkRecord>),

    #[error("end ({end_ts}) must be after start ({start_ts})")]
    EndNotAfterStart { start_ts: i64, end_ts: i64 },

    #[error("no ongoing project to terminate.")]
    NothingOngoing,

    #[error(transparent)]
    Time(#[from] TimeParseError),
}

impl OverlapError {
    /// Records to list alongside the message
    pub fn records(&self) -> &[WorkRecord] {
        match self {
            OverlapError::Conflict(records)
            | OverlapError::Enclosed(records)
            | OverlapError::EditConflict(records) => records,
            _ => &[],
        }
    }
}

/// A single storage write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOp {
    Insert(NewRecord),
    /// End several records at the same instant
    Close { ids: Vec<i64>, end_ts: i64 },
    /// End one record, optionally moving it to another project
    Finish { id: i64, end_ts: i64, project_id: Option<i64> },
    /// Overwrite only the given fields
    Update {
        id: i64,
        project_id: Option<i64>,
        start_ts: Option<i64>,
        end_ts: Option<i64>,
    },
}

/// Writes to apply, in order, inside one transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub ops: Vec<RecordOp>,
    /// Existing records whose end is changed by the plan
    pub closed: Vec<WorkRecord>,
    pub warning: Option<String>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Parameters of `work on`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    pub project_id: i64,
    pub start_ts: i64,
    pub end_ts: Option<i64>,
    pub force: bool,
}

fn check_order(start_ts: i64, end_ts: Option<i64>) -> Result<(), OverlapError> {
    match end_ts {
        Some(end_ts) if end_ts <= start_ts => Err(OverlapError::EndNotAfterStart { start_ts, end_ts }),
        _ => Ok(()),
    }
}

fn unassigned_warning(records: &[WorkRecord]) -> Option<String> {
    let ids: Vec<String> = records
        .iter()
        .filter(|r| r.project_id == UNASSIGNED_PROJECT_ID)
        .map(|r| r.id.to_string())
        .collect();
    if ids.is_empty() {
        None
    } else {
        Some(format!(
            "ended record(s) {} still belong to '{}', assign them with `edit id <id> project <path>`",
            ids.join(","),
            UNASSIGNED_PROJECT_NAME
        ))
    }
}

/// Decide how to start a new record
///
/// Records crossing the new start or end are ended at the new start only
/// when `force` is set; otherwise nothing is written. Records starting
/// inside the new interval are never ended automatically.
pub fn plan_start(req: &StartRequest, conflicts: &Conflicts) -> Result<Plan, OverlapError> {
    check_order(req.start_ts, req.end_ts)?;

    if !conflicts.enclosed.is_empty() {
        return Err(OverlapError::Enclosed(conflicts.all()));
    }

    let crossing = conflicts.crossing();
    if !crossing.is_empty() && !req.force {
        return Err(OverlapError::Conflict(crossing));
    }

    let mut ops = Vec::new();
    if !crossing.is_empty() {
        log::debug!(
            "forced start ends {} record(s) at {}",
            crossing.len(),
            req.start_ts
        );
        ops.push(RecordOp::Close {
            ids: crossing.iter().map(|r| r.id).collect(),
            end_ts: req.start_ts,
        });
    }
    ops.push(RecordOp::Insert(NewRecord {
        project_id: req.project_id,
        start_ts: req.start_ts,
        end_ts: req.end_ts,
    }));

    Ok(Plan {
        ops,
        warning: unassigned_warning(&crossing),
        closed: crossing,
    })
}

/// How `work done` picks an end instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndRule {
    /// Resolved instant
    At(i64),
    /// Fixed length from each record's start
    ForSeconds(i64),
    /// Absolute instant, or offset from each record's start
    Until(TimeSpec),
}

impl EndRule {
    fn end_for(&self, record: &WorkRecord) -> Result<i64, OverlapError> {
        match self {
            EndRule::At(ts) => Ok(*ts),
            EndRule::ForSeconds(secs) => Ok(record.start_ts + secs),
            EndRule::Until(spec) => Ok(spec.resolve_from(from_timestamp(record.start_ts)?)?.timestamp()),
        }
    }
}

/// Decide how to end the open records
pub fn plan_finish(open: &[WorkRecord], rule: &EndRule, project_id: Option<i64>) -> Result<Plan, OverlapError> {
    if open.is_empty() {
        return Err(OverlapError::NothingOngoing);
    }

    let mut ops = Vec::with_capacity(open.len());
    for record in open {
        let end_ts = rule.end_for(record)?;
        check_order(record.start_ts, Some(end_ts))?;
        ops.push(RecordOp::Finish {
            id: record.id,
            end_ts,
            project_id,
        });
    }

    let warning = if project_id.is_none() {
        unassigned_warning(open)
    } else {
        None
    };
    Ok(Plan {
        ops,
        closed: open.to_vec(),
        warning,
    })
}

/// Compute the interval proposed by `edit`
///
/// Relative values shift the stored start or end. A relative end on an
/// open record shifts from `now`.
pub fn propose_interval(
    current: &WorkRecord,
    from: Option<&TimeSpec>,
    to: Option<&TimeSpec>,
    now: DateTime<Local>,
) -> Result<(i64, Option<i64>), OverlapError> {
    let start_ts = match from {
        Some(spec) => spec.resolve_from(from_timestamp(current.start_ts)?)?.timestamp(),
        None => current.start_ts,
    };
    let end_ts = match to {
        Some(spec) => {
            let anchor = current.end_ts.map(from_timestamp).transpose()?.unwrap_or(now);
            Some(spec.resolve_from(anchor)?.timestamp())
        }
        None => current.end_ts,
    };
    Ok((start_ts, end_ts))
}

/// Decide how to apply an edit; `snapshot` must cover the new interval
pub fn plan_edit(
    current: &WorkRecord,
    project_id: Option<i64>,
    start_ts: i64,
    end_ts: Option<i64>,
    snapshot: &[WorkRecord],
) -> Result<Plan, OverlapError> {
    check_order(start_ts, end_ts)?;

    let conflicts = Conflicts::detect(snapshot, start_ts, end_ts, Some(current.id));
    if !conflicts.is_empty() {
        return Err(OverlapError::EditConflict(conflicts.all()));
    }

    let project_id = project_id.filter(|p| *p != current.project_id);
    let new_start = Some(start_ts).filter(|s| *s != current.start_ts);
    let new_end = end_ts.filter(|_| end_ts != current.end_ts);
    if project_id.is_none() && new_start.is_none() && new_end.is_none() {
        return Ok(Plan::default());
    }

    Ok(Plan {
        ops: vec![RecordOp::Update {
            id: current.id,
            project_id,
            start_ts: new_start,
            end_ts: new_end,
        }],
        closed: Vec::new(),
        warning: None,
    })
}
