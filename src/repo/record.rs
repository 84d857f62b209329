use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;
use crate::models::{NewRecord, WorkRecord};
use crate::overlap::RecordOp;
use anyhow::{Context, Result};

/// Work record repository
///
/// Plain reads and writes. Overlap decisions are made in
/// [`crate::overlap`] and applied here with [`RecordRepo::apply`].
pub struct RecordRepo;

const COLUMNS: &str = "id, project_id, start_ts, end_ts";

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<WorkRecord> {
    Ok(WorkRecord {
        id: row.get(0)?,
        project_id: row.get(1)?,
        start_ts: row.get(2)?,
        end_ts: row.get(3)?,
    })
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

fn query_records<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<WorkRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, row_to_record)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

impl RecordRepo {
    /// Insert a record
    pub fn insert(conn: &Connection, record: &NewRecord) -> Result<WorkRecord> {
        conn.execute(
            "INSERT INTO records (project_id, start_ts, end_ts) VALUES (?1, ?2, ?3)",
            rusqlite::params![record.project_id, record.start_ts, record.end_ts],
        )
        .context("Failed to insert record")?;

        let id = conn.last_insert_rowid();
        log::debug!("inserted record {} ({}..{:?})", id, record.start_ts, record.end_ts);
        Ok(WorkRecord {
            id,
            project_id: record.project_id,
            start_ts: record.start_ts,
            end_ts: record.end_ts,
        })
    }

    /// Get record by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<WorkRecord>> {
        let record = conn
            .query_row(
                &format!("SELECT {} FROM records WHERE id = ?1", COLUMNS),
                [id],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Get the records among `ids` that exist, ordered by id
    pub fn get_by_ids(conn: &Connection, ids: &[i64]) -> Result<Vec<WorkRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM records WHERE id IN ({}) ORDER BY id",
            COLUMNS,
            placeholders(ids.len())
        );
        query_records(conn, &sql, params_from_iter(ids.iter()))
    }

    /// Records starting in `[start, end)`, ordered by start
    pub fn get_by_time_range(conn: &Connection, start: i64, end: i64) -> Result<Vec<WorkRecord>> {
        query_records(
            conn,
            &format!(
                "SELECT {} FROM records WHERE start_ts >= ?1 AND start_ts < ?2 ORDER BY start_ts, id",
                COLUMNS
            ),
            [start, end],
        )
    }

    /// Records sharing any time with `[start, end)` (`end = None`: unbounded)
    pub fn intersecting(conn: &Connection, start: i64, end: Option<i64>) -> Result<Vec<WorkRecord>> {
        query_records(
            conn,
            &format!(
                "SELECT {} FROM records
                 WHERE (end_ts IS NULL OR end_ts > ?1) AND (?2 IS NULL OR start_ts < ?2)
                 ORDER BY start_ts, id",
                COLUMNS
            ),
            rusqlite::params![start, end],
        )
    }

    /// Records running across instant `at`
    pub fn overlapping_at(conn: &Connection, at: Option<i64>) -> Result<Vec<WorkRecord>> {
        let Some(at) = at else {
            return Ok(Vec::new());
        };
        query_records(
            conn,
            &format!(
                "SELECT {} FROM records
                 WHERE (start_ts < ?1 AND end_ts > ?1) OR (end_ts IS NULL AND start_ts < ?1)
                 ORDER BY start_ts, id",
                COLUMNS
            ),
            [at],
        )
    }

    /// Records without an end
    pub fn get_ongoing(conn: &Connection) -> Result<Vec<WorkRecord>> {
        query_records(
            conn,
            &format!("SELECT {} FROM records WHERE end_ts IS NULL ORDER BY start_ts, id", COLUMNS),
            [],
        )
    }

    /// Ids of records assigned to any of `projects`
    pub fn for_projects(conn: &Connection, projects: &BTreeSet<i64>) -> Result<Vec<i64>> {
        if projects.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT id FROM records WHERE project_id IN ({}) ORDER BY id",
            placeholders(projects.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(projects.iter()), |row| row.get(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    /// The `n` most recently created records, newest first
    pub fn last(conn: &Connection, n: usize) -> Result<Vec<WorkRecord>> {
        query_records(
            conn,
            &format!("SELECT {} FROM records ORDER BY id DESC LIMIT ?1", COLUMNS),
            [n as i64],
        )
    }

    /// Overwrite the given fields of one record
    pub fn update(
        conn: &Connection,
        id: i64,
        project_id: Option<i64>,
        start_ts: Option<i64>,
        end_ts: Option<i64>,
    ) -> Result<()> {
        conn.execute(
            "UPDATE records SET
                project_id = COALESCE(?2, project_id),
                start_ts = COALESCE(?3, start_ts),
                end_ts = COALESCE(?4, end_ts)
             WHERE id = ?1",
            rusqlite::params![id, project_id, start_ts, end_ts],
        )
        .with_context(|| format!("Failed to update record {}", id))?;
        Ok(())
    }

    /// Set the end of several records
    pub fn update_end(conn: &Connection, ids: &[i64], end_ts: i64) -> Result<usize> {
        let mut updated = 0;
        for id in ids {
            updated += conn
                .execute(
                    "UPDATE records SET end_ts = ?1 WHERE id = ?2",
                    rusqlite::params![end_ts, id],
                )
                .with_context(|| format!("Failed to end record {}", id))?;
        }
        Ok(updated)
    }

    /// Set the end of one record and optionally move it to another project
    pub fn update_end_and_project(conn: &Connection, id: i64, end_ts: i64, project_id: Option<i64>) -> Result<()> {
        Self::update(conn, id, project_id, None, Some(end_ts))
    }

    /// Delete records in one transaction
    pub fn delete(conn: &Connection, ids: &[i64]) -> Result<usize> {
        let tx = conn.unchecked_transaction()?;
        let mut deleted = 0;
        for id in ids {
            deleted += tx
                .execute("DELETE FROM records WHERE id = ?1", [id])
                .with_context(|| format!("Failed to delete record {}", id))?;
        }
        tx.commit()?;
        log::debug!("deleted records {:?}", ids);
        Ok(deleted)
    }

    /// Apply planned writes in order, in one transaction
    ///
    /// Returns the records inserted by the plan.
    pub fn apply(conn: &Connection, ops: &[RecordOp]) -> Result<Vec<WorkRecord>> {
        let tx = conn.unchecked_transaction()?;
        let mut inserted = Vec::new();
        for op in ops {
            match op {
                RecordOp::Insert(record) => inserted.push(Self::insert(&tx, record)?),
                RecordOp::Close { ids, end_ts } => {
                    Self::update_end(&tx, ids, *end_ts)?;
                }
                RecordOp::Finish { id, end_ts, project_id } => {
                    Self::update_end_and_project(&tx, *id, *end_ts, *project_id)?;
                }
                RecordOp::Update { id, project_id, start_ts, end_ts } => {
                    Self::update(&tx, *id, *project_id, *start_ts, *end_ts)?;
                }
            }
        }
        tx.commit().context("Failed to commit record changes")?;
        Ok(inserted)
    }
}
