use serde::{Deserialize, Serialize};

/// Id of the project every record falls back to
pub const UNASSIGNED_PROJECT_ID: i64 = 1;

/// Name of the fallback project
pub const UNASSIGNED_PROJECT_NAME: &str = "Not assigned";

/// Separator between path segments (`Client.Backend`)
pub const PATH_SEPARATOR: char = '.';

/// A project as stored: a leaf name plus a pointer to its parent
///
/// The full dotted path is never stored; it is derived from the parent
/// chain by [`crate::hierarchy::ProjectTree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectNode {
    pub id: i64,
    pub parent: Option<i64>,
    pub name: String,
}

impl ProjectNode {
    pub fn new(id: i64, parent: Option<i64>, name: impl Into<String>) -> Self {
        Self {
            id,
            parent,
            name: name.into(),
        }
    }

    /// The fallback project cannot be renamed or deleted
    pub fn is_protected(&self) -> bool {
        self.id == UNASSIGNED_PROJECT_ID
    }
}
