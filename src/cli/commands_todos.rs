// Handler for `todo`

use rusqlite::Connection;
use crate::cli::commands::{load_tree, resolve_optional_project, CommandContext};
use crate::cli::error::{validate_id, validate_non_empty, validate_priority};
use crate::cli::options::{interpret_at, OptionMap, TODO};
use crate::cli::outcome::CommandOutcome;
use crate::cli::output::{format_todos_table, is_tty};
use crate::models::{TodoChanges, TodoItem, UNASSIGNED_PROJECT_ID};
use crate::repo::TodoRepo;
use anyhow::Result;

const ACTIONS: &[&str] = &["add", "list", "done", "rm", "id"];

/// `todo add DESCR`, `todo [list] [all]`, `todo done N`, `todo rm N`,
/// `todo id N ...`
pub fn handle_todo(conn: &Connection, ctx: &CommandContext, args: &[String]) -> Result<CommandOutcome> {
    let opts = or_fail!(interpret_at(args, &TODO, ctx.now));

    let given: Vec<&str> = ACTIONS.iter().copied().filter(|a| opts.has(a)).collect();
    if given.len() > 1 {
        return Ok(CommandOutcome::failure(format!(
            "options {} are mutually exclusive",
            given.iter().map(|a| format!("'{}'", a)).collect::<Vec<_>>().join(", ")
        )));
    }

    if let Some(descr) = opts.text("add") {
        return add_todo(conn, ctx, &opts, descr);
    }
    if let Some(id_str) = opts.text("done") {
        let id = or_fail!(validate_id(id_str, "todo"));
        return close_todo(conn, ctx, &opts, id);
    }
    if let Some(id_str) = opts.text("rm") {
        let id = or_fail!(validate_id(id_str, "todo"));
        return remove_todo(conn, id);
    }
    if let Some(id_str) = opts.text("id") {
        let id = or_fail!(validate_id(id_str, "todo"));
        return modify_todo(conn, ctx, &opts, id);
    }
    list_todos(conn, ctx, &opts)
}

/// Priority, due date and description changes carried by the options
fn requested_changes(ctx: &CommandContext, opts: &OptionMap) -> std::result::Result<TodoChanges, String> {
    let priority = opts.text("priority").map(validate_priority).transpose()?;
    let due_ts = opts
        .time("due")
        .map(|spec| spec.resolve(ctx.now).map(|dt| dt.timestamp()))
        .transpose()
        .map_err(|e| e.to_string())?;
    let descr = match opts.text("descr") {
        Some(text) => {
            validate_non_empty(text, "Description")?;
            Some(text.to_string())
        }
        None => None,
    };
    Ok(TodoChanges { priority, due_ts, descr })
}

fn add_todo(conn: &Connection, ctx: &CommandContext, opts: &OptionMap, descr: &str) -> Result<CommandOutcome> {
    or_fail!(validate_non_empty(descr, "Description"));
    let tree = load_tree(conn)?;
    let project_id = or_fail!(resolve_optional_project(&tree, opts, "on")).unwrap_or(UNASSIGNED_PROJECT_ID);
    let changes = or_fail!(requested_changes(ctx, opts));

    let todo = TodoRepo::insert(
        conn,
        project_id,
        changes.priority.unwrap_or(0),
        changes.due_ts,
        descr,
        ctx.now_ts(),
    )?;
    Ok(CommandOutcome::notify(format!("Added todo {}: {}", todo.id, todo.descr)))
}

fn existing(conn: &Connection, id: i64) -> Result<std::result::Result<TodoItem, CommandOutcome>> {
    Ok(TodoRepo::get_by_id(conn, id)?
        .ok_or_else(|| CommandOutcome::failure(format!("no todo with id {}", id))))
}

fn close_todo(conn: &Connection, ctx: &CommandContext, opts: &OptionMap, id: i64) -> Result<CommandOutcome> {
    let todo = match existing(conn, id)? {
        Ok(todo) => todo,
        Err(outcome) => return Ok(outcome),
    };
    if todo.is_done() {
        return Ok(CommandOutcome::failure(format!("todo {} is already done", id)));
    }
    let done_ts = match opts.time("at") {
        Some(spec) => or_fail!(spec.resolve(ctx.now)).timestamp(),
        None => ctx.now_ts(),
    };
    TodoRepo::close(conn, id, done_ts)?;
    Ok(CommandOutcome::notify(format!("Completed todo {}: {}", id, todo.descr)))
}

fn remove_todo(conn: &Connection, id: i64) -> Result<CommandOutcome> {
    if let Err(outcome) = existing(conn, id)? {
        return Ok(outcome);
    }
    TodoRepo::delete(conn, id)?;
    Ok(CommandOutcome::notify(format!("Deleted todo {}", id)))
}

fn modify_todo(conn: &Connection, ctx: &CommandContext, opts: &OptionMap, id: i64) -> Result<CommandOutcome> {
    let todo = match existing(conn, id)? {
        Ok(todo) => todo,
        Err(outcome) => return Ok(outcome),
    };
    let tree = load_tree(conn)?;
    let project_id = or_fail!(resolve_optional_project(&tree, opts, "on"));
    let changes = or_fail!(requested_changes(ctx, opts));

    if project_id.is_none() && changes.is_empty() {
        return Ok(CommandOutcome::failure("Nothing to change: give on, priority, due or descr."));
    }
    if todo.is_done() && !changes.is_empty() {
        return Ok(CommandOutcome::failure(format!(
            "todo {} is done; only its project can change",
            id
        )));
    }

    let tx = conn.unchecked_transaction()?;
    if let Some(project_id) = project_id {
        TodoRepo::reassign(&tx, id, project_id)?;
    }
    if !changes.is_empty() {
        TodoRepo::update(&tx, id, &changes)?;
    }
    tx.commit()?;
    Ok(CommandOutcome::notify(format!("Updated todo {}", id)))
}

fn list_todos(conn: &Connection, ctx: &CommandContext, opts: &OptionMap) -> Result<CommandOutcome> {
    let tree = load_tree(conn)?;
    let scope = or_fail!(resolve_optional_project(&tree, opts, "on")).map(|id| tree.subtree(id));

    let mut todos = TodoRepo::list(conn, opts.has("all"))?;
    if let Some(scope) = &scope {
        todos.retain(|t| scope.contains(&t.project_id));
    }

    if opts.has("json") {
        let json_todos: Vec<serde_json::Value> = todos
            .iter()
            .map(|todo| {
                serde_json::json!({
                    "id": todo.id,
                    "project_id": todo.project_id,
                    "project": tree.path(todo.project_id),
                    "priority": todo.priority,
                    "open_ts": todo.open_ts,
                    "done_ts": todo.done_ts,
                    "due_ts": todo.due_ts,
                    "descr": todo.descr,
                })
            })
            .collect();
        return Ok(CommandOutcome::output(serde_json::to_string_pretty(&json_todos)?));
    }

    Ok(CommandOutcome::output(format_todos_table(&todos, &tree, ctx.now_ts(), is_tty())))
}
