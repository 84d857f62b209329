use clap::{Parser, Subcommand};
use chrono::{DateTime, Local};
use rusqlite::Connection;
use std::path::PathBuf;
use crate::config::Config;
use crate::db::DbConnection;
use crate::hierarchy::{resolve_project, ProjectTree};
use crate::models::{WorkRecord, UNASSIGNED_PROJECT_ID};
use crate::overlap::{plan_finish, plan_start, Conflicts, EndRule, OverlapError, StartRequest};
use crate::repo::{ProjectRepo, RecordRepo, TodoRepo};
use crate::cli::commands_projects::handle_project;
use crate::cli::commands_records::{handle_edit, handle_rm, handle_show, handle_stats};
use crate::cli::commands_todos::handle_todo;
use crate::cli::error::user_error;
use crate::cli::options::{complete, interpret_at, schema_for, CompletionSource, OptionMap, WORK};
use crate::cli::outcome::CommandOutcome;
use crate::cli::output::{format_records_table, format_timestamp};
use crate::report::natural_cmp;
use crate::utils::date::now_seconds;
use anyhow::{Context, Result};

/// Number of record ids offered by completion
const COMPLETION_RECORD_COUNT: usize = 20;

#[derive(Parser)]
#[command(name = "worktime")]
#[command(about = "Worktime - track time spent on hierarchical projects")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Database file (overrides data.location from ~/.worktime/rc)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start or finish work (e.g. "on Client.Backend at 9:00 for 2h", "done at -10m")
    Work {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// List records in a period (e.g. "today", "lastweek", "from -3d on Work")
    Show {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Time spent per project in a period (same options as show)
    Stats {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Change a record (e.g. "id 12 project Home from +15m to 17:00")
    Edit {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Delete records (e.g. "id 12" or "id 3,4,7")
    Rm {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Manage projects (list, add A.B.C, rm A.B, id N [rename NAME])
    Project {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Manage todos (list [all], add TEXT [on P] [priority N] [due T], done N, id N ..., rm N)
    Todo {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Print completion candidates for the last word of a command line
    Complete {
        /// Command word being completed
        #[arg(default_value = "")]
        command: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

/// Per-invocation values shared by all handlers
#[derive(Debug, Clone, Copy)]
pub struct CommandContext {
    /// Current time, whole seconds
    pub now: DateTime<Local>,
    /// Days in a `thisweek` / `lastweek` window
    pub week_days: u32,
}

impl CommandContext {
    pub fn now_ts(&self) -> i64 {
        self.now.timestamp()
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?;
    let db_path = DbConnection::resolve_path(cli.db.as_deref(), &config)?;
    log::debug!("using database {}", db_path.display());
    let conn = DbConnection::connect(&db_path)
        .context("Failed to connect to database")?;

    let ctx = CommandContext {
        now: now_seconds(),
        week_days: config.week_days,
    };
    let outcome = dispatch(&conn, &ctx, &cli.command)?;
    outcome.emit();
    if let Some(message) = &outcome.error {
        user_error(message);
    }
    Ok(())
}

/// Run one command against an open database
pub fn dispatch(conn: &Connection, ctx: &CommandContext, command: &Commands) -> Result<CommandOutcome> {
    match command {
        Commands::Work { args } => handle_work(conn, ctx, args),
        Commands::Show { args } => handle_show(conn, ctx, args),
        Commands::Stats { args } => handle_stats(conn, ctx, args),
        Commands::Edit { args } => handle_edit(conn, ctx, args),
        Commands::Rm { args } => handle_rm(conn, ctx, args),
        Commands::Project { args } => handle_project(conn, ctx, args),
        Commands::Todo { args } => handle_todo(conn, ctx, args),
        Commands::Complete { command, args } => handle_complete(conn, command, args),
    }
}

/// Snapshot of the project tree for one command
pub(crate) fn load_tree(conn: &Connection) -> Result<ProjectTree> {
    let nodes = ProjectRepo::list_nodes(conn).context("Failed to load projects")?;
    Ok(ProjectTree::build(&nodes))
}

/// Resolve an optional `on`/`project` value to a project id
pub(crate) fn resolve_optional_project(
    tree: &ProjectTree,
    opts: &OptionMap,
    name: &str,
) -> std::result::Result<Option<i64>, crate::hierarchy::HierarchyError> {
    opts.text(name)
        .map(|path| resolve_project(tree, path))
        .transpose()
}

/// Failed outcome for a refused record change, listing the records involved
pub(crate) fn overlap_failure(err: OverlapError, tree: &ProjectTree, now: i64) -> CommandOutcome {
    let detail = if err.records().is_empty() {
        String::new()
    } else {
        format_records_table(err.records(), tree, now, false)
    };
    CommandOutcome::failure_with(&err, &detail)
}

fn join_ids(ids: impl IntoIterator<Item = i64>) -> String {
    ids.into_iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",")
}

/// `work on ...` and `work done ...`
pub fn handle_work(conn: &Connection, ctx: &CommandContext, args: &[String]) -> Result<CommandOutcome> {
    let opts = or_fail!(interpret_at(args, &WORK, ctx.now));
    if opts.has("for") && opts.has("until") {
        return Ok(CommandOutcome::failure("options 'for' and 'until' are mutually exclusive"));
    }
    if opts.has("done") {
        return handle_work_done(conn, ctx, &opts);
    }

    let tree = load_tree(conn)?;
    let project_id = or_fail!(resolve_optional_project(&tree, &opts, "on")).unwrap_or(UNASSIGNED_PROJECT_ID);

    let start = match opts.time("at") {
        Some(spec) => or_fail!(spec.resolve(ctx.now)),
        None => ctx.now,
    };
    let end = if let Some(span) = opts.duration("for") {
        match start.checked_add_signed(span.to_chrono()) {
            Some(end) => Some(end),
            None => return Ok(CommandOutcome::failure("end time is out of range")),
        }
    } else if let Some(spec) = opts.time("until") {
        Some(or_fail!(spec.resolve(ctx.now)))
    } else {
        None
    };

    let request = StartRequest {
        project_id,
        start_ts: start.timestamp(),
        end_ts: end.map(|e| e.timestamp()),
        force: opts.has("force"),
    };
    let snapshot = start_snapshot(conn, request.start_ts, request.end_ts)?;
    let conflicts = Conflicts::detect(&snapshot, request.start_ts, request.end_ts, None);
    let plan = match plan_start(&request, &conflicts) {
        Ok(plan) => plan,
        Err(e) => return Ok(overlap_failure(e, &tree, ctx.now_ts())),
    };

    let inserted = RecordRepo::apply(conn, &plan.ops)?;
    let path = tree.path(project_id).unwrap_or_default();
    let mut message = match (inserted.first(), request.end_ts) {
        (Some(record), Some(end_ts)) => format!(
            "Inserted record {} for {} from {} to {}",
            record.id,
            path,
            format_timestamp(record.start_ts),
            format_timestamp(end_ts)
        ),
        (Some(record), None) => format!(
            "Started record {} on {} at {}",
            record.id,
            path,
            format_timestamp(record.start_ts)
        ),
        (None, _) => format!("Started work on {}", path),
    };
    if !plan.closed.is_empty() {
        message.push_str(&format!(
            "\nEnded record(s) {} at {}",
            join_ids(plan.closed.iter().map(|r| r.id)),
            format_timestamp(request.start_ts)
        ));
    }

    Ok(CommandOutcome::notify(message).with_warning(plan.warning))
}

/// Records running across the new start or end, plus those starting
/// inside the new interval
fn start_snapshot(conn: &Connection, start_ts: i64, end_ts: Option<i64>) -> Result<Vec<WorkRecord>> {
    let mut snapshot = RecordRepo::overlapping_at(conn, Some(start_ts))?;
    snapshot.extend(RecordRepo::overlapping_at(conn, end_ts)?);
    snapshot.extend(RecordRepo::get_by_time_range(conn, start_ts, end_ts.unwrap_or(i64::MAX))?);
    snapshot.sort_by_key(|r| (r.start_ts, r.id));
    snapshot.dedup_by_key(|r| r.id);
    Ok(snapshot)
}

fn handle_work_done(conn: &Connection, ctx: &CommandContext, opts: &OptionMap) -> Result<CommandOutcome> {
    if opts.has("at") && (opts.has("for") || opts.has("until")) {
        return Ok(CommandOutcome::failure("option 'at' cannot be combined with 'for' or 'until'"));
    }

    let tree = load_tree(conn)?;
    let project_id = or_fail!(resolve_optional_project(&tree, opts, "on"));

    let rule = if let Some(span) = opts.duration("for") {
        EndRule::ForSeconds(span.total_seconds())
    } else if let Some(spec) = opts.time("until") {
        EndRule::Until(*spec)
    } else {
        let end = match opts.time("at") {
            Some(spec) => or_fail!(spec.resolve(ctx.now)),
            None => ctx.now,
        };
        EndRule::At(end.timestamp())
    };

    let open = RecordRepo::get_ongoing(conn)?;
    let plan = match plan_finish(&open, &rule, project_id) {
        Ok(plan) => plan,
        Err(e) => return Ok(overlap_failure(e, &tree, ctx.now_ts())),
    };
    RecordRepo::apply(conn, &plan.ops)?;

    let finished = RecordRepo::get_by_ids(conn, &plan.closed.iter().map(|r| r.id).collect::<Vec<_>>())?;
    let message = format!(
        "Ended record(s) {}\n{}",
        join_ids(finished.iter().map(|r| r.id)),
        format_records_table(&finished, &tree, ctx.now_ts(), crate::cli::output::is_tty())
    );
    Ok(CommandOutcome::notify(message).with_warning(plan.warning))
}

/// Completion data read from the database; lookup failures give no
/// candidates
struct DbCompletionSource<'a> {
    conn: &'a Connection,
}

impl CompletionSource for DbCompletionSource<'_> {
    fn project_paths(&self) -> Vec<String> {
        match load_tree(self.conn) {
            Ok(tree) => {
                let mut paths: Vec<String> = tree.flat_paths().values().cloned().collect();
                paths.sort_by(|a, b| natural_cmp(a, b));
                paths
            }
            Err(e) => {
                log::warn!("project completion failed: {:#}", e);
                Vec::new()
            }
        }
    }

    fn project_ids(&self) -> Vec<i64> {
        match ProjectRepo::list_nodes(self.conn) {
            Ok(nodes) => nodes.iter().map(|n| n.id).collect(),
            Err(e) => {
                log::warn!("project id completion failed: {:#}", e);
                Vec::new()
            }
        }
    }

    fn recent_record_ids(&self) -> Vec<i64> {
        match RecordRepo::last(self.conn, COMPLETION_RECORD_COUNT) {
            Ok(records) => records.iter().map(|r| r.id).collect(),
            Err(e) => {
                log::warn!("record completion failed: {:#}", e);
                Vec::new()
            }
        }
    }

    fn open_todo_ids(&self) -> Vec<i64> {
        match TodoRepo::list(self.conn, false) {
            Ok(todos) => todos.iter().map(|t| t.id).collect(),
            Err(e) => {
                log::warn!("todo completion failed: {:#}", e);
                Vec::new()
            }
        }
    }
}

const COMMAND_WORDS: &[&str] = &["work", "show", "stats", "edit", "rm", "project", "todo"];

/// `complete <command> [tokens...]`: one candidate per line
pub fn handle_complete(conn: &Connection, command: &str, args: &[String]) -> Result<CommandOutcome> {
    let candidates: Vec<String> = match schema_for(command) {
        Some(schema) => complete(schema, args, &DbCompletionSource { conn }),
        None if args.is_empty() => COMMAND_WORDS
            .iter()
            .filter(|word| word.starts_with(command))
            .map(|word| word.to_string())
            .collect(),
        None => Vec::new(),
    };

    if candidates.is_empty() {
        return Ok(CommandOutcome {
            success: true,
            ..CommandOutcome::default()
        });
    }
    Ok(CommandOutcome::output(candidates.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRecord;
    use chrono::TimeZone;

    fn ctx() -> CommandContext {
        CommandContext {
            now: Local.with_ymd_and_hms(2024, 3, 13, 12, 0, 0).single().unwrap(),
            week_days: 5,
        }
    }

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn ts(h: u32, m: u32) -> i64 {
        Local.with_ymd_and_hms(2024, 3, 13, h, m, 0).single().unwrap().timestamp()
    }

    fn setup() -> Connection {
        let conn = DbConnection::connect_in_memory().unwrap();
        ProjectRepo::insert(&conn, None, "Work").unwrap();
        conn
    }

    #[test]
    fn test_force_overrides_conflict() {
        let conn = setup();
        let c = ctx();
        assert!(handle_work(&conn, &c, &args("on Work at 10:00 for 1h")).unwrap().success);

        let refused = handle_work(&conn, &c, &args("on Work at 10:30 for 15m")).unwrap();
        assert!(!refused.success);
        assert!(refused.error.unwrap().contains("1 record(s) overlap"));
        assert_eq!(RecordRepo::last(&conn, 10).unwrap().len(), 1);

        let forced = handle_work(&conn, &c, &args("on Work at 10:30 for 15m force")).unwrap();
        assert!(forced.success);
        let records = RecordRepo::get_by_time_range(&conn, 0, i64::MAX).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].end_ts, Some(ts(10, 30)));
        assert_eq!((records[1].start_ts, records[1].end_ts), (ts(10, 30), Some(ts(10, 45))));
    }

    #[test]
    fn test_open_record_blocks_start_until_forced() {
        let conn = setup();
        let c = ctx();
        handle_work(&conn, &c, &args("at 9:00")).unwrap();

        let refused = handle_work(&conn, &c, &args("on Work at 11:00")).unwrap();
        assert!(!refused.success);
        assert!(refused.error.unwrap().contains("1 record(s) overlap"));
        let ongoing = RecordRepo::get_ongoing(&conn).unwrap();
        assert_eq!(ongoing.len(), 1);
        assert_eq!((ongoing[0].project_id, ongoing[0].start_ts), (UNASSIGNED_PROJECT_ID, ts(9, 0)));
        assert_eq!(RecordRepo::last(&conn, 10).unwrap().len(), 1);

        let outcome = handle_work(&conn, &c, &args("on Work at 11:00 force")).unwrap();
        assert!(outcome.success);
        assert!(outcome.warning.unwrap().contains("Not assigned"));
        assert_eq!(RecordRepo::get_by_id(&conn, ongoing[0].id).unwrap().unwrap().end_ts, Some(ts(11, 0)));
        assert_eq!(RecordRepo::get_ongoing(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_start_snapshot_collects_each_conflict_once() {
        let conn = setup();
        let insert = |start: i64, end: i64| {
            RecordRepo::insert(&conn, &NewRecord { project_id: 2, start_ts: start, end_ts: Some(end) })
                .unwrap()
                .id
        };
        insert(ts(8, 0), ts(9, 0));
        let crossing_start = insert(ts(9, 0), ts(10, 30));
        let enclosed = insert(ts(10, 40), ts(10, 45));
        let crossing_end = insert(ts(10, 50), ts(12, 0));

        let ids = |snapshot: Vec<WorkRecord>| snapshot.iter().map(|r| r.id).collect::<Vec<_>>();
        assert_eq!(
            ids(start_snapshot(&conn, ts(10, 0), Some(ts(11, 0))).unwrap()),
            vec![crossing_start, enclosed, crossing_end]
        );
        assert_eq!(
            ids(start_snapshot(&conn, ts(10, 35), Some(ts(10, 40))).unwrap()),
            Vec::<i64>::new()
        );
        assert_eq!(
            ids(start_snapshot(&conn, ts(10, 0), None).unwrap()),
            vec![crossing_start, enclosed, crossing_end]
        );
    }

    #[test]
    fn test_done_with_huge_duration_is_refused() {
        let conn = setup();
        let c = ctx();
        handle_work(&conn, &c, &args("on Work at 9:00")).unwrap();

        let outcome = handle_work(&conn, &c, &args("done for 4294967295w")).unwrap();
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("out of range"));
        assert_eq!(RecordRepo::get_ongoing(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_work_option_errors() {
        let conn = setup();
        let c = ctx();
        let outcome = handle_work(&conn, &c, &args("on Work for 1h until 12:00")).unwrap();
        assert_eq!(outcome.error.as_deref(), Some("options 'for' and 'until' are mutually exclusive"));

        let outcome = handle_work(&conn, &c, &args("on Wrok")).unwrap();
        assert!(outcome.error.unwrap().contains("did you mean: Work"));

        let outcome = handle_work(&conn, &c, &args("on Work at 10:00 until 9:00")).unwrap();
        assert!(!outcome.success);
        assert!(RecordRepo::last(&conn, 1).unwrap().is_empty());
    }

    #[test]
    fn test_done_without_open_record() {
        let conn = setup();
        let outcome = handle_work(&conn, &ctx(), &args("done")).unwrap();
        assert_eq!(outcome.error.as_deref(), Some("no ongoing project to terminate."));
    }

    #[test]
    fn test_done_with_duration_and_reassignment() {
        let conn = setup();
        let c = ctx();
        handle_work(&conn, &c, &args("at 9:00")).unwrap();

        let outcome = handle_work(&conn, &c, &args("done for 2h on Work")).unwrap();
        assert!(outcome.success, "{:?}", outcome.error);
        let record = RecordRepo::last(&conn, 1).unwrap().remove(0);
        assert_eq!(record.end_ts, Some(ts(11, 0)));
        assert_eq!(record.project_id, 2);

        let outcome = handle_work(&conn, &c, &args("done at 10:00 for 1h")).unwrap();
        assert!(!outcome.success);
    }

    #[test]
    fn test_complete() {
        let conn = setup();
        let outcome = handle_complete(&conn, "work", &args("on W")).unwrap();
        assert_eq!(outcome.output.as_deref(), Some("Work"));

        let outcome = handle_complete(&conn, "st", &[]).unwrap();
        assert_eq!(outcome.output.as_deref(), Some("stats"));

        let outcome = handle_complete(&conn, "work", &args("on Nothing zz")).unwrap();
        assert!(outcome.success && outcome.output.is_none());
    }
}
