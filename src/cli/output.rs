// Output formatting utilities

use crate::hierarchy::{NestedProject, ProjectTree};
use crate::models::{TodoItem, WorkRecord, PATH_SEPARATOR};
use crate::report::{Stats, Window};
use chrono::{Local, TimeZone};
use std::io::IsTerminal;

// ANSI escape codes for terminal formatting
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_RESET: &str = "\x1b[0m";
const ANSI_FG_RED: &str = "\x1b[31m";
const ANSI_FG_GREEN: &str = "\x1b[32m";
const ANSI_FG_YELLOW: &str = "\x1b[33m";

/// Columns other than the project column take at least this much room
const FIXED_COLUMNS_WIDTH: usize = 60;
const MIN_PROJECT_WIDTH: usize = 12;

/// Check if stdout is a terminal (TTY)
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width dynamically
///
/// Uses the `terminal_size` crate, with fallback to the COLUMNS
/// environment variable and a default.
pub fn get_terminal_width() -> usize {
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        if w > 0 {
            return w as usize;
        }
    }

    if let Ok(cols) = std::env::var("COLUMNS") {
        if let Ok(width) = cols.parse::<usize>() {
            if width > 0 && width < 10000 {
                return width;
            }
        }
    }

    120
}

fn paint(text: &str, code: Option<&str>, color: bool) -> String {
    match code {
        Some(code) if color => format!("{}{}{}", code, text, ANSI_RESET),
        _ => text.to_string(),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let kept: String = text.chars().take(width.saturating_sub(2)).collect();
        format!("{}..", kept)
    }
}

/// Width available to a project path column
fn project_column_width(paths: impl Iterator<Item = usize>) -> usize {
    let cap = get_terminal_width()
        .saturating_sub(FIXED_COLUMNS_WIDTH)
        .max(MIN_PROJECT_WIDTH);
    paths.max().unwrap_or(0).clamp("Project".len(), cap)
}

/// One table cell: text plus an optional colour
struct Cell {
    text: String,
    style: Option<&'static str>,
}

impl Cell {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: None,
        }
    }

    fn styled(text: impl Into<String>, style: Option<&'static str>) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Left-aligned table with a header and a separator line
///
/// Padding is computed on the raw text so colours do not skew columns.
fn render_table(headers: &[&str], rows: &[Vec<Cell>], color: bool) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.text.chars().count());
        }
    }

    let mut output = String::new();
    let header: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:<w$}", h, w = *w))
        .collect();
    output.push_str(&paint(header.join(" ").trim_end(), Some(ANSI_BOLD), color));
    output.push('\n');

    let total_width = widths.iter().sum::<usize>() + widths.len().saturating_sub(1);
    output.push_str(&"-".repeat(total_width));

    for row in rows {
        output.push('\n');
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| {
                let padded = format!("{:<w$}", cell.text, w = *w);
                paint(&padded, cell.style, color)
            })
            .collect();
        output.push_str(line.join(" ").trim_end());
    }
    output
}

/// Format timestamp for display
pub fn format_timestamp(ts: i64) -> String {
    match Local.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}

/// Format duration for display as `H:MM:SS` (hours are not wrapped)
pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}

fn project_label(tree: &ProjectTree, project_id: i64) -> String {
    tree.path(project_id)
        .map(str::to_string)
        .unwrap_or_else(|| format!("[{}]", project_id))
}

/// Records as a table; open records show their running time
pub fn format_records_table(records: &[WorkRecord], tree: &ProjectTree, now: i64, color: bool) -> String {
    if records.is_empty() {
        return "No records found.".to_string();
    }

    let width = project_column_width(records.iter().map(|r| project_label(tree, r.project_id).chars().count()));
    let rows: Vec<Vec<Cell>> = records
        .iter()
        .map(|record| {
            let (end, duration, style) = match record.end_ts {
                Some(end) => (format_timestamp(end), end - record.start_ts, None),
                None => ("running".to_string(), now - record.start_ts, Some(ANSI_FG_YELLOW)),
            };
            vec![
                Cell::plain(record.id.to_string()),
                Cell::plain(truncate(&project_label(tree, record.project_id), width)),
                Cell::plain(format_timestamp(record.start_ts)),
                Cell::styled(end, style),
                Cell::plain(format_duration(duration)),
            ]
        })
        .collect();

    render_table(&["ID", "Project", "Start", "End", "Duration"], &rows, color)
}

/// `Showing from ... to ...` style header for a window
pub fn format_window(label: &str, window: &Window) -> String {
    format!(
        "{} from {} to {}",
        label,
        format_timestamp(window.start_ts()),
        format_timestamp(window.end_ts())
    )
}

/// Indented leaf name: roots as-is, children as `└─name` under their parent
fn tree_label(path: &str, depth: usize) -> String {
    if depth == 0 {
        return path.to_string();
    }
    let leaf = path.rsplit(PATH_SEPARATOR).next().unwrap_or(path);
    format!("{}└─{}", "  ".repeat(depth - 1), leaf)
}

/// Project tree as a table, depth first
pub fn format_projects_table(tree: &ProjectTree, color: bool) -> String {
    let rooted = tree.rooted();
    let mut rows = Vec::new();
    let mut stack: Vec<(&NestedProject, usize)> = rooted.iter().rev().map(|p| (p, 0)).collect();

    while let Some((project, depth)) = stack.pop() {
        let style = if depth == 0 { Some(ANSI_FG_GREEN) } else { None };
        rows.push(vec![
            Cell::plain(project.id.to_string()),
            Cell::styled(tree_label(&project.path, depth), style),
            Cell::plain(project.path.clone()),
        ]);
        stack.extend(project.children.iter().rev().map(|c| (c, depth + 1)));
    }

    render_table(&["ID", "Project", "Path"], &rows, color)
}

/// Per-project totals with a final total row
pub fn format_stats_table(stats: &Stats, color: bool) -> String {
    let mut rows: Vec<Vec<Cell>> = stats
        .rows
        .iter()
        .map(|row| {
            let style = if row.depth == 0 { Some(ANSI_FG_GREEN) } else { None };
            vec![
                Cell::plain(row.project_id.to_string()),
                Cell::styled(tree_label(&row.path, row.depth), style),
                Cell::plain(format_duration(row.seconds)),
            ]
        })
        .collect();
    rows.push(vec![
        Cell::styled("Total", Some(ANSI_BOLD)),
        Cell::plain("[All projects]"),
        Cell::styled(format_duration(stats.total_seconds), Some(ANSI_BOLD)),
    ]);

    render_table(&["ID", "Project", "Time spent"], &rows, color)
}

/// Todos as a table; overdue due dates are highlighted
pub fn format_todos_table(todos: &[TodoItem], tree: &ProjectTree, now: i64, color: bool) -> String {
    if todos.is_empty() {
        return "No todos found.".to_string();
    }

    let width = project_column_width(todos.iter().map(|t| project_label(tree, t.project_id).chars().count()));
    let rows: Vec<Vec<Cell>> = todos
        .iter()
        .map(|todo| {
            let due_style = if todo.is_overdue(now) { Some(ANSI_FG_RED) } else { None };
            vec![
                Cell::plain(todo.id.to_string()),
                Cell::plain(todo.priority.to_string()),
                Cell::plain(truncate(&project_label(tree, todo.project_id), width)),
                Cell::styled(todo.due_ts.map(format_timestamp).unwrap_or_default(), due_style),
                Cell::plain(todo.done_ts.map(format_timestamp).unwrap_or_default()),
                Cell::plain(todo.descr.clone()),
            ]
        })
        .collect();

    render_table(&["ID", "Pri", "Project", "Due", "Done", "Description"], &rows, color)
}
