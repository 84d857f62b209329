// Project hierarchy: tree views over the flat (id, parent, name) relation
// and the decisions made against them (resolution, add, rename, delete).

pub mod resolve;
pub mod tree;

pub use resolve::{
    check_delete, deletion_scope, plan_add, plan_rename, resolve_project, AddPlan, HierarchyError,
};
pub use tree::{NestedProject, ProjectTree, TreeEntry};
