// Handlers for show, stats, edit and rm

use rusqlite::Connection;
use std::collections::BTreeSet;
use crate::cli::commands::{load_tree, overlap_failure, resolve_optional_project, CommandContext};
use crate::cli::error::{parse_id_list, validate_id};
use crate::cli::options::{interpret_at, OptionMap, EDIT, RM, SHOW, STATS};
use crate::cli::outcome::CommandOutcome;
use crate::cli::output::{format_records_table, format_stats_table, format_window, is_tty};
use crate::hierarchy::ProjectTree;
use crate::overlap::{plan_edit, propose_interval};
use crate::repo::RecordRepo;
use crate::report::{compute_stats, resolve_window, Shortcut, Window, WindowRequest};
use anyhow::Result;

/// Shortcut names by precedence when several are given
const SHORTCUT_PRECEDENCE: &[&str] = &["yesterday", "lastweek", "thisweek", "today"];

fn window_request(opts: &OptionMap) -> WindowRequest {
    WindowRequest {
        shortcut: SHORTCUT_PRECEDENCE
            .iter()
            .find(|name| opts.has(name))
            .and_then(|name| Shortcut::from_name(name)),
        from: opts.time("from").copied(),
        until: opts.time("until").copied(),
        span: opts.duration("for").copied(),
    }
}

/// Window and optional project scope shared by show and stats
struct Selection {
    tree: ProjectTree,
    window: Window,
    scope: Option<BTreeSet<i64>>,
}

impl Selection {
    fn admits(&self, project_id: i64) -> bool {
        self.scope.as_ref().map_or(true, |scope| scope.contains(&project_id))
    }
}

fn select(conn: &Connection, ctx: &CommandContext, opts: &OptionMap) -> Result<std::result::Result<Selection, CommandOutcome>> {
    let tree = load_tree(conn)?;
    let window = match resolve_window(&window_request(opts), ctx.now, ctx.week_days) {
        Ok(window) => window,
        Err(e) => return Ok(Err(CommandOutcome::failure(e))),
    };
    if window.end <= window.start {
        return Ok(Err(CommandOutcome::failure(format!(
            "empty period: {} is not after {}",
            window.end, window.start
        ))));
    }
    let scope = match resolve_optional_project(&tree, opts, "on") {
        Ok(project) => project.map(|id| tree.subtree(id)),
        Err(e) => return Ok(Err(CommandOutcome::failure(e))),
    };
    Ok(Ok(Selection { tree, window, scope }))
}

/// `show [today|yesterday|thisweek|lastweek] [from T] [for D] [until T] [on P] [json]`
pub fn handle_show(conn: &Connection, ctx: &CommandContext, args: &[String]) -> Result<CommandOutcome> {
    let opts = or_fail!(interpret_at(args, &SHOW, ctx.now));
    let selection = match select(conn, ctx, &opts)? {
        Ok(selection) => selection,
        Err(outcome) => return Ok(outcome),
    };

    let mut records = RecordRepo::get_by_time_range(conn, selection.window.start_ts(), selection.window.end_ts())?;
    records.retain(|r| selection.admits(r.project_id));

    if opts.has("json") {
        let json_records: Vec<serde_json::Value> = records
            .iter()
            .map(|record| {
                serde_json::json!({
                    "id": record.id,
                    "project_id": record.project_id,
                    "project": selection.tree.path(record.project_id),
                    "start_ts": record.start_ts,
                    "end_ts": record.end_ts,
                    "duration": record.end_ts.unwrap_or(ctx.now_ts()) - record.start_ts,
                })
            })
            .collect();
        return Ok(CommandOutcome::output(serde_json::to_string_pretty(&json_records)?));
    }

    Ok(CommandOutcome::output(format!(
        "{}\n{}",
        format_window("Showing", &selection.window),
        format_records_table(&records, &selection.tree, ctx.now_ts(), is_tty())
    )))
}

/// `stats` with the same window options as `show`
pub fn handle_stats(conn: &Connection, ctx: &CommandContext, args: &[String]) -> Result<CommandOutcome> {
    let opts = or_fail!(interpret_at(args, &STATS, ctx.now));
    let selection = match select(conn, ctx, &opts)? {
        Ok(selection) => selection,
        Err(outcome) => return Ok(outcome),
    };

    let window = &selection.window;
    let mut records = RecordRepo::intersecting(conn, window.start_ts(), Some(window.end_ts()))?;
    records.retain(|r| selection.admits(r.project_id));

    let mut stats = compute_stats(&selection.tree, &records, window, ctx.now_ts());
    stats.rows.retain(|row| selection.admits(row.project_id));

    if opts.has("json") {
        let json = serde_json::json!({
            "start_ts": window.start_ts(),
            "end_ts": window.end_ts(),
            "rows": stats.rows,
            "total_seconds": stats.total_seconds,
        });
        return Ok(CommandOutcome::output(serde_json::to_string_pretty(&json)?));
    }

    Ok(CommandOutcome::output(format!(
        "{}\n{}",
        format_window("Stats", window),
        format_stats_table(&stats, is_tty())
    )))
}

/// `edit id N [project P] [from T] [to T]`
pub fn handle_edit(conn: &Connection, ctx: &CommandContext, args: &[String]) -> Result<CommandOutcome> {
    let opts = or_fail!(interpret_at(args, &EDIT, ctx.now));
    let Some(id_str) = opts.text("id") else {
        return Ok(CommandOutcome::failure("Required parameter `id` is missing."));
    };
    let id = or_fail!(validate_id(id_str, "record"));
    if !(opts.has("project") || opts.has("from") || opts.has("to")) {
        return Ok(CommandOutcome::failure("Nothing to edit: give project, from or to."));
    }

    let tree = load_tree(conn)?;
    let project_id = or_fail!(resolve_optional_project(&tree, &opts, "project"));

    // Relative values shift the stored interval, so read it first.
    let Some(current) = RecordRepo::get_by_id(conn, id)? else {
        return Ok(CommandOutcome::failure(format!("no record with id {}", id)));
    };
    let (start_ts, end_ts) = match propose_interval(&current, opts.time("from"), opts.time("to"), ctx.now) {
        Ok(interval) => interval,
        Err(e) => return Ok(overlap_failure(e, &tree, ctx.now_ts())),
    };

    let snapshot = RecordRepo::intersecting(conn, start_ts, end_ts)?;
    let plan = match plan_edit(&current, project_id, start_ts, end_ts, &snapshot) {
        Ok(plan) => plan,
        Err(e) => return Ok(overlap_failure(e, &tree, ctx.now_ts())),
    };
    if plan.is_empty() {
        return Ok(CommandOutcome::notify(format!("Record {} unchanged.", id)));
    }

    RecordRepo::apply(conn, &plan.ops)?;
    let updated: Vec<_> = RecordRepo::get_by_id(conn, id)?.into_iter().collect();
    Ok(CommandOutcome::notify(format!(
        "Updated record {}\n{}",
        id,
        format_records_table(&updated, &tree, ctx.now_ts(), is_tty())
    )))
}

/// `rm id N[,N...]`; every id must exist
pub fn handle_rm(conn: &Connection, ctx: &CommandContext, args: &[String]) -> Result<CommandOutcome> {
    let opts = or_fail!(interpret_at(args, &RM, ctx.now));
    let Some(spec) = opts.text("id") else {
        return Ok(CommandOutcome::failure("Required parameter `id` is missing."));
    };
    let ids = or_fail!(parse_id_list(spec, "record"));

    let found: BTreeSet<i64> = RecordRepo::get_by_ids(conn, &ids)?.iter().map(|r| r.id).collect();
    let missing: Vec<String> = ids
        .iter()
        .filter(|id| !found.contains(id))
        .map(|id| id.to_string())
        .collect();
    if !missing.is_empty() {
        return Ok(CommandOutcome::failure(format!(
            "no record with id {}, nothing deleted",
            missing.join(",")
        )));
    }

    let deleted = RecordRepo::delete(conn, &ids)?;
    let listed: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    Ok(CommandOutcome::notify(format!(
        "Deleted {} record(s): {}",
        deleted,
        listed.join(",")
    )))
}
