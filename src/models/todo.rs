use serde::{Deserialize, Serialize};

/// A todo item attached to a project
///
/// Open until `done_ts` is set. Once closed, only `project_id` may change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: i64,
    pub project_id: i64,
    pub priority: i64,
    pub open_ts: i64,
    pub done_ts: Option<i64>,
    pub due_ts: Option<i64>,
    pub descr: String,
}

impl TodoItem {
    pub fn is_done(&self) -> bool {
        self.done_ts.is_some()
    }

    /// Open and past its due time
    pub fn is_overdue(&self, now: i64) -> bool {
        !self.is_done() && self.due_ts.map_or(false, |due| due < now)
    }
}

/// Field changes for an open todo; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoChanges {
    pub priority: Option<i64>,
    pub due_ts: Option<i64>,
    pub descr: Option<String>,
}

impl TodoChanges {
    pub fn is_empty(&self) -> bool {
        self.priority.is_none() && self.due_ts.is_none() && self.descr.is_none()
    }
}
