use rusqlite::{Connection, OptionalExtension, Row};
use std::collections::BTreeSet;
use crate::models::ProjectNode;
use anyhow::{Context, Result};

/// Project repository for database operations
///
/// Projects are stored as `(id, parent, name)` rows. Dotted paths are never
/// stored; build a [`crate::hierarchy::ProjectTree`] from
/// [`ProjectRepo::list_nodes`] to get them.
///
/// # Example
///
/// ```no_run
/// use worktime::db::DbConnection;
/// use worktime::repo::ProjectRepo;
///
/// let conn = DbConnection::connect_in_memory().unwrap();
/// let work = ProjectRepo::insert(&conn, None, "Work").unwrap();
/// let email = ProjectRepo::insert(&conn, Some(work.id), "Email").unwrap();
/// ```
pub struct ProjectRepo;

fn row_to_node(row: &Row<'_>) -> rusqlite::Result<ProjectNode> {
    Ok(ProjectNode {
        id: row.get(0)?,
        parent: row.get(1)?,
        name: row.get(2)?,
    })
}

impl ProjectRepo {
    /// Snapshot of every project
    pub fn list_nodes(conn: &Connection) -> Result<Vec<ProjectNode>> {
        let mut stmt = conn.prepare("SELECT id, parent, name FROM projects ORDER BY id")?;
        let rows = stmt.query_map([], row_to_node)?;

        let mut nodes = Vec::new();
        for row in rows {
            nodes.push(row?);
        }
        Ok(nodes)
    }

    /// Get project by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<ProjectNode>> {
        let node = conn
            .query_row(
                "SELECT id, parent, name FROM projects WHERE id = ?1",
                [id],
                row_to_node,
            )
            .optional()?;
        Ok(node)
    }

    /// Create a new project
    pub fn insert(conn: &Connection, parent: Option<i64>, name: &str) -> Result<ProjectNode> {
        conn.execute(
            "INSERT INTO projects (parent, name) VALUES (?1, ?2)",
            rusqlite::params![parent, name],
        )
        .with_context(|| format!("Failed to create project: {}", name))?;

        let id = conn.last_insert_rowid();
        log::debug!("inserted project {} '{}' under {:?}", id, name, parent);
        Ok(ProjectNode::new(id, parent, name))
    }

    /// Rename a project (leaf name only)
    pub fn rename(conn: &Connection, id: i64, new_name: &str) -> Result<()> {
        conn.execute(
            "UPDATE projects SET name = ?1 WHERE id = ?2",
            rusqlite::params![new_name, id],
        )
        .with_context(|| format!("Failed to rename project {} to {}", id, new_name))?;
        Ok(())
    }

    /// Delete a set of projects in one transaction
    pub fn delete_many(conn: &Connection, ids: &BTreeSet<i64>) -> Result<usize> {
        let tx = conn.unchecked_transaction()?;
        let mut deleted = 0;
        for id in ids {
            deleted += tx
                .execute("DELETE FROM projects WHERE id = ?1", [id])
                .with_context(|| format!("Failed to delete project {}", id))?;
        }
        tx.commit()?;
        log::debug!("deleted projects {:?}", ids);
        Ok(deleted)
    }
}
