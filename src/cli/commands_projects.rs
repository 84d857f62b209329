// Handler for `project`

use rusqlite::Connection;
use crate::cli::commands::{load_tree, CommandContext};
use crate::cli::error::validate_id;
use crate::cli::options::{interpret_at, PROJECT};
use crate::cli::outcome::CommandOutcome;
use crate::cli::output::{format_projects_table, is_tty};
use crate::hierarchy::{check_delete, deletion_scope, plan_add, plan_rename, resolve_project, AddPlan, HierarchyError};
use crate::models::PATH_SEPARATOR;
use crate::repo::{ProjectRepo, RecordRepo, TodoRepo};
use anyhow::Result;

/// `project [list] [json]`, `project add P`, `project rm P`,
/// `project id N [rename NAME]`
pub fn handle_project(conn: &Connection, ctx: &CommandContext, args: &[String]) -> Result<CommandOutcome> {
    let opts = or_fail!(interpret_at(args, &PROJECT, ctx.now));

    let actions = ["list", "add", "rm", "id"].iter().filter(|a| opts.has(a)).count();
    if actions > 1 {
        return Ok(CommandOutcome::failure(
            "options 'list', 'add', 'rm' and 'id' are mutually exclusive",
        ));
    }
    if opts.has("rename") && !opts.has("id") {
        return Ok(CommandOutcome::failure("option 'rename' requires 'id'"));
    }

    if let Some(path) = opts.text("add") {
        return add_project(conn, path);
    }
    if let Some(path) = opts.text("rm") {
        return remove_project(conn, path);
    }
    if let Some(id_str) = opts.text("id") {
        let id = or_fail!(validate_id(id_str, "project"));
        return match opts.text("rename") {
            Some(new_name) => rename_project(conn, id, new_name),
            None => show_project(conn, id),
        };
    }
    list_projects(conn, opts.has("json"))
}

fn list_projects(conn: &Connection, json: bool) -> Result<CommandOutcome> {
    let tree = load_tree(conn)?;
    if json {
        return Ok(CommandOutcome::output(serde_json::to_string_pretty(&tree.rooted())?));
    }
    Ok(CommandOutcome::output(format_projects_table(&tree, is_tty())))
}

fn add_project(conn: &Connection, path: &str) -> Result<CommandOutcome> {
    let tree = load_tree(conn)?;
    match or_fail!(plan_add(&tree, path)) {
        AddPlan::Exists(id) => Ok(CommandOutcome::notify(format!(
            "Project '{}' already exists (id {}).",
            path, id
        ))),
        AddPlan::Create { parent, name } => {
            let node = ProjectRepo::insert(conn, parent, &name)?;
            let mut outcome = CommandOutcome::notify(format!("Added project '{}' (id {}).", name, node.id));
            if parent.is_none() && path.contains(PATH_SEPARATOR) {
                let missing = path.rsplit_once(PATH_SEPARATOR).map_or(path, |(p, _)| p);
                outcome = outcome.with_warning(Some(format!(
                    "parent '{}' does not exist, '{}' was added at the top level",
                    missing, name
                )));
            }
            Ok(outcome)
        }
    }
}

fn remove_project(conn: &Connection, path: &str) -> Result<CommandOutcome> {
    let tree = load_tree(conn)?;
    let id = or_fail!(resolve_project(&tree, path));
    let scope = or_fail!(deletion_scope(&tree, id));

    let record_ids = RecordRepo::for_projects(conn, &scope)?;
    let todo_ids = TodoRepo::for_projects(conn, &scope)?;
    or_fail!(check_delete(&tree, id, &record_ids, &todo_ids));

    let deleted = ProjectRepo::delete_many(conn, &scope)?;
    Ok(CommandOutcome::notify(format!(
        "Deleted project '{}' ({} project(s) removed).",
        path, deleted
    )))
}

fn show_project(conn: &Connection, id: i64) -> Result<CommandOutcome> {
    let tree = load_tree(conn)?;
    let Some(path) = tree.path(id) else {
        return Ok(CommandOutcome::failure(HierarchyError::UnknownProjectId(id)));
    };
    let children = tree.get(id).map_or(0, |entry| entry.children_idx.len());
    Ok(CommandOutcome::output(format!(
        "{}: {} ({} subproject(s))",
        id, path, children
    )))
}

fn rename_project(conn: &Connection, id: i64, new_name: &str) -> Result<CommandOutcome> {
    let tree = load_tree(conn)?;
    if !or_fail!(plan_rename(&tree, id, new_name)) {
        return Ok(CommandOutcome::notify(format!("Project {} unchanged.", id)));
    }
    ProjectRepo::rename(conn, id, new_name)?;
    let old = tree.path(id).unwrap_or_default();
    Ok(CommandOutcome::notify(format!(
        "Renamed project {} from '{}' to '{}'.",
        id, old, new_name
    )))
}
