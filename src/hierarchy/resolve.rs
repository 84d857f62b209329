use std::collections::BTreeSet;
use thiserror::Error;

use super::tree::ProjectTree;
use crate::models::{UNASSIGNED_PROJECT_ID, PATH_SEPARATOR};
use crate::utils::fuzzy::suggest_paths;

/// Refusals produced by hierarchy decisions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("unknown project '{path}'{}", did_you_mean(.suggestions))]
    UnknownProject { path: String, suggestions: Vec<String> },

    #[error("no project with id {0}")]
    UnknownProjectId(i64),

    #[error("invalid project name '{0}'")]
    InvalidName(String),

    #[error("Can't change project path. Please rename parent project first.")]
    PathInName(String),

    #[error("a project named '{name}' already exists {}", location(.parent))]
    DuplicateSibling { parent: Option<String>, name: String },

    #[error("project '{0}' is protected")]
    Protected(String),

    #[error("project '{path}' is still used by {records} record(s) and {todos} todo(s)")]
    InUse { path: String, records: usize, todos: usize },
}

fn did_you_mean(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(", did you mean: {}", suggestions.join(", "))
    }
}

fn location(parent: &Option<String>) -> String {
    match parent {
        Some(path) => format!("under '{}'", path),
        None => "at the top level".to_string(),
    }
}

/// Outcome of planning `project add`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddPlan {
    /// The path already names a project; nothing to insert
    Exists(i64),
    Create { parent: Option<i64>, name: String },
}

/// Look up a project by its dotted path
pub fn resolve_project(tree: &ProjectTree, path: &str) -> Result<i64, HierarchyError> {
    tree.id_of(path).ok_or_else(|| HierarchyError::UnknownProject {
        path: path.to_string(),
        suggestions: suggest_paths(path, tree.flat_paths().values().map(String::as_str)),
    })
}

fn validate_name(name: &str) -> Result<(), HierarchyError> {
    if name.trim().is_empty() || name.trim() != name {
        return Err(HierarchyError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Decide what `project add <path>` inserts
///
/// The parent is the existing project named by every segment but the last.
/// When that parent does not exist the new project is created as a root
/// named after the last segment.
pub fn plan_add(tree: &ProjectTree, path: &str) -> Result<AddPlan, HierarchyError> {
    if let Some(id) = tree.id_of(path) {
        return Ok(AddPlan::Exists(id));
    }

    let (parent_path, name) = match path.rsplit_once(PATH_SEPARATOR) {
        Some((parent, leaf)) => (Some(parent), leaf),
        None => (None, path),
    };
    validate_name(name)?;

    let parent = match parent_path.and_then(|p| tree.id_of(p)) {
        Some(id) => Some(id),
        None => {
            if let Some(missing) = parent_path {
                log::info!("parent '{}' does not exist, adding '{}' as a root", missing, name);
            }
            None
        }
    };

    if tree.child_named(parent, name).is_some() {
        return Err(HierarchyError::DuplicateSibling {
            parent: parent.and_then(|id| tree.path(id)).map(str::to_string),
            name: name.to_string(),
        });
    }

    Ok(AddPlan::Create {
        parent,
        name: name.to_string(),
    })
}

/// Validate renaming project `id` to `new_name`
///
/// Returns `false` when the name is unchanged.
pub fn plan_rename(tree: &ProjectTree, id: i64, new_name: &str) -> Result<bool, HierarchyError> {
    let entry = tree.get(id).ok_or(HierarchyError::UnknownProjectId(id))?;
    if entry.node.is_protected() {
        return Err(HierarchyError::Protected(entry.node.name.clone()));
    }
    if new_name.contains(PATH_SEPARATOR) {
        return Err(HierarchyError::PathInName(new_name.to_string()));
    }
    validate_name(new_name)?;
    if entry.node.name == new_name {
        return Ok(false);
    }

    // Orphans live among the roots, so look them up there.
    let parent = entry.node.parent.filter(|p| tree.contains(*p) && !tree.orphans().contains(&id));
    if tree.child_named(parent, new_name).is_some_and(|other| other != id) {
        return Err(HierarchyError::DuplicateSibling {
            parent: parent.and_then(|p| tree.path(p)).map(str::to_string),
            name: new_name.to_string(),
        });
    }
    Ok(true)
}

/// Ids removed by deleting project `id`: the project and its subtree
pub fn deletion_scope(tree: &ProjectTree, id: i64) -> Result<BTreeSet<i64>, HierarchyError> {
    let entry = tree.get(id).ok_or(HierarchyError::UnknownProjectId(id))?;
    let scope = tree.subtree(id);
    if scope.contains(&UNASSIGNED_PROJECT_ID) {
        return Err(HierarchyError::Protected(entry.node.name.clone()));
    }
    Ok(scope)
}

/// Refuse deletion while any record or todo points into the subtree
pub fn check_delete(
    tree: &ProjectTree,
    id: i64,
    record_ids: &[i64],
    todo_ids: &[i64],
) -> Result<(), HierarchyError> {
    if record_ids.is_empty() && todo_ids.is_empty() {
        return Ok(());
    }
    Err(HierarchyError::InUse {
        path: tree.path(id).unwrap_or_default().to_string(),
        records: record_ids.len(),
        todos: todo_ids.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProjectNode;

    fn tree() -> ProjectTree {
        ProjectTree::build(&[
            ProjectNode::new(1, None, "Not assigned"),
            ProjectNode::new(2, None, "Client"),
            ProjectNode::new(3, Some(2), "Backend"),
            ProjectNode::new(4, Some(3), "Api"),
        ])
    }

    #[test]
    fn test_resolve_project_suggests() {
        let tree = tree();
        assert_eq!(resolve_project(&tree, "Client.Backend"), Ok(3));
        match resolve_project(&tree, "Client.Bakend") {
            Err(HierarchyError::UnknownProject { suggestions, .. }) => {
                assert_eq!(suggestions[0], "Client.Backend");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_plan_add_under_existing_parent() {
        let tree = tree();
        assert_eq!(
            plan_add(&tree, "Client.Frontend"),
            Ok(AddPlan::Create { parent: Some(2), name: "Frontend".to_string() })
        );
        assert_eq!(plan_add(&tree, "Client.Backend"), Ok(AddPlan::Exists(3)));
    }

    #[test]
    fn test_plan_add_falls_back_to_root() {
        let tree = tree();
        assert_eq!(
            plan_add(&tree, "Nope.Deeper.Leaf"),
            Ok(AddPlan::Create { parent: None, name: "Leaf".to_string() })
        );
        assert!(matches!(
            plan_add(&tree, "Nope.Client"),
            Err(HierarchyError::DuplicateSibling { .. })
        ));
        assert!(matches!(plan_add(&tree, "Client."), Err(HierarchyError::InvalidName(_))));
    }

    #[test]
    fn test_plan_rename() {
        let tree = tree();
        assert_eq!(plan_rename(&tree, 3, "Server"), Ok(true));
        assert_eq!(plan_rename(&tree, 3, "Backend"), Ok(false));
        assert!(matches!(plan_rename(&tree, 1, "Other"), Err(HierarchyError::Protected(_))));
        assert!(matches!(plan_rename(&tree, 3, "a.b"), Err(HierarchyError::PathInName(_))));
        assert!(matches!(plan_rename(&tree, 2, "Not assigned"), Err(HierarchyError::DuplicateSibling { .. })));
        assert_eq!(plan_rename(&tree, 42, "x"), Err(HierarchyError::UnknownProjectId(42)));
    }

    #[test]
    fn test_delete_checks() {
        let tree = tree();
        assert_eq!(deletion_scope(&tree, 3), Ok([3, 4].into_iter().collect()));
        assert!(matches!(deletion_scope(&tree, 1), Err(HierarchyError::Protected(_))));

        assert_eq!(check_delete(&tree, 3, &[], &[]), Ok(()));
        assert_eq!(
            check_delete(&tree, 3, &[17], &[]),
            Err(HierarchyError::InUse { path: "Client.Backend".to_string(), records: 1, todos: 0 })
        );
    }
}
