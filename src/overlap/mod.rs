// Overlap-aware record model
//
// Everything here works on record snapshots and returns the writes to
// perform; nothing touches storage directly.

pub mod detect;
pub mod plan;

pub use detect::{find_overlapping, Conflicts};
pub use plan::{
    plan_edit, plan_finish, plan_start, propose_interval, EndRule, OverlapError, Plan, RecordOp,
    StartRequest,
};
