use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;
use crate::models::{TodoChanges, TodoItem};
use anyhow::{Context, Result};

/// Todo repository
pub struct TodoRepo;

const COLUMNS: &str = "id, project_id, priority, open_ts, done_ts, due_ts, descr";

fn row_to_todo(row: &Row<'_>) -> rusqlite::Result<TodoItem> {
    Ok(TodoItem {
        id: row.get(0)?,
        project_id: row.get(1)?,
        priority: row.get(2)?,
        open_ts: row.get(3)?,
        done_ts: row.get(4)?,
        due_ts: row.get(5)?,
        descr: row.get(6)?,
    })
}

impl TodoRepo {
    /// Create an open todo
    pub fn insert(
        conn: &Connection,
        project_id: i64,
        priority: i64,
        due_ts: Option<i64>,
        descr: &str,
        open_ts: i64,
    ) -> Result<TodoItem> {
        conn.execute(
            "INSERT INTO todos (project_id, priority, open_ts, due_ts, descr)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![project_id, priority, open_ts, due_ts, descr],
        )
        .with_context(|| format!("Failed to create todo: {}", descr))?;

        let id = conn.last_insert_rowid();
        log::debug!("inserted todo {}", id);
        Ok(TodoItem {
            id,
            project_id,
            priority,
            open_ts,
            done_ts: None,
            due_ts,
            descr: descr.to_string(),
        })
    }

    /// Get todo by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<TodoItem>> {
        let todo = conn
            .query_row(
                &format!("SELECT {} FROM todos WHERE id = ?1", COLUMNS),
                [id],
                row_to_todo,
            )
            .optional()?;
        Ok(todo)
    }

    /// List todos, most urgent first
    ///
    /// Open todos come before closed ones, then higher priority, then
    /// earlier due date (undated last).
    pub fn list(conn: &Connection, include_done: bool) -> Result<Vec<TodoItem>> {
        let filter = if include_done { "" } else { "WHERE done_ts IS NULL" };
        let sql = format!(
            "SELECT {} FROM todos {}
             ORDER BY done_ts IS NOT NULL, priority DESC, due_ts IS NULL, due_ts, id",
            COLUMNS, filter
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_todo)?;

        let mut todos = Vec::new();
        for row in rows {
            todos.push(row?);
        }
        Ok(todos)
    }

    /// Mark a todo as done
    pub fn close(conn: &Connection, id: i64, done_ts: i64) -> Result<()> {
        conn.execute(
            "UPDATE todos SET done_ts = ?1 WHERE id = ?2",
            rusqlite::params![done_ts, id],
        )
        .with_context(|| format!("Failed to close todo {}", id))?;
        Ok(())
    }

    /// Apply field changes to a todo
    pub fn update(conn: &Connection, id: i64, changes: &TodoChanges) -> Result<()> {
        conn.execute(
            "UPDATE todos SET
                priority = COALESCE(?2, priority),
                due_ts = COALESCE(?3, due_ts),
                descr = COALESCE(?4, descr)
             WHERE id = ?1",
            rusqlite::params![id, changes.priority, changes.due_ts, changes.descr],
        )
        .with_context(|| format!("Failed to update todo {}", id))?;
        Ok(())
    }

    /// Move a todo to another project
    pub fn reassign(conn: &Connection, id: i64, project_id: i64) -> Result<()> {
        conn.execute(
            "UPDATE todos SET project_id = ?1 WHERE id = ?2",
            rusqlite::params![project_id, id],
        )
        .with_context(|| format!("Failed to reassign todo {}", id))?;
        Ok(())
    }

    /// Delete a todo
    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        conn.execute("DELETE FROM todos WHERE id = ?1", [id])
            .with_context(|| format!("Failed to delete todo {}", id))?;
        Ok(())
    }

    /// Ids of todos assigned to any of `projects`
    pub fn for_projects(conn: &Connection, projects: &BTreeSet<i64>) -> Result<Vec<i64>> {
        if projects.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT id FROM todos WHERE project_id IN ({}) ORDER BY id",
            vec!["?"; projects.len()].join(",")
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(projects.iter()), |row| row.get(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }
}
