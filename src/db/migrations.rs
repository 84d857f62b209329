use rusqlite::{Connection, Result};
use std::collections::HashMap;

/// Current database schema version
const CURRENT_VERSION: u32 = 2;

/// Migration system for managing database schema versions
pub struct MigrationManager;

impl MigrationManager {
    /// Initialize the database with the current schema
    /// This creates the schema_version table and applies all migrations
    pub fn initialize(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            [],
        )?;

        let current_version = Self::get_version(conn)?;
        for version in (current_version + 1)..=CURRENT_VERSION {
            log::info!("applying schema migration v{}", version);
            Self::apply_migration(conn, version)?;
        }

        Ok(())
    }

    /// Apply a specific migration by version number
    fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
        let migrations = get_migrations();
        if let Some(migration) = migrations.get(&version) {
            let tx = conn.unchecked_transaction()?;
            migration(&tx)?;
            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [version],
            )?;
            tx.commit()?;
            Ok(())
        } else {
            Err(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_MISUSE),
                Some(format!("No migration found for version {}", version)),
            ))
        }
    }

    /// Get the current schema version
    pub fn get_version(conn: &Connection) -> Result<u32> {
        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
    }
}

type Migration = fn(&rusqlite::Transaction) -> Result<(), rusqlite::Error>;

/// Get all migrations indexed by version
fn get_migrations() -> HashMap<u32, Migration> {
    let mut migrations: HashMap<u32, Migration> = HashMap::new();
    migrations.insert(1, migration_v1);
    migrations.insert(2, migration_v2);
    migrations
}

/// Migration v1: projects and work records
fn migration_v1(tx: &rusqlite::Transaction) -> Result<(), rusqlite::Error> {
    // Hierarchy is explicit: each project points at its parent.
    tx.execute(
        "CREATE TABLE projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            parent INTEGER NULL,
            name TEXT NOT NULL
        )",
        [],
    )?;
    // Sibling names are unique; roots share the implicit parent 0.
    tx.execute(
        "CREATE UNIQUE INDEX idx_projects_sibling_name ON projects(IFNULL(parent, 0), name)",
        [],
    )?;
    tx.execute(
        "INSERT INTO projects (id, parent, name) VALUES (1, NULL, 'Not assigned')",
        [],
    )?;

    tx.execute(
        "CREATE TABLE records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER NOT NULL DEFAULT 1 REFERENCES projects(id),
            start_ts INTEGER NOT NULL,
            end_ts INTEGER NULL
        )",
        [],
    )?;
    tx.execute("CREATE INDEX idx_records_start ON records(start_ts)", [])?;
    tx.execute("CREATE INDEX idx_records_end ON records(end_ts)", [])?;
    tx.execute("CREATE INDEX idx_records_project ON records(project_id)", [])?;

    Ok(())
}

/// Migration v2: todo items attached to projects
fn migration_v2(tx: &rusqlite::Transaction) -> Result<(), rusqlite::Error> {
    tx.execute(
        "CREATE TABLE todos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER NOT NULL DEFAULT 1 REFERENCES projects(id),
            priority INTEGER NOT NULL DEFAULT 0,
            open_ts INTEGER NOT NULL,
            done_ts INTEGER NULL,
            due_ts INTEGER NULL,
            descr TEXT NOT NULL
        )",
        [],
    )?;
    tx.execute("CREATE INDEX idx_todos_project ON todos(project_id)", [])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .unwrap()
            == 1
    }

    #[test]
    fn test_initialize_creates_schema() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::initialize(&conn).unwrap();

        assert_eq!(MigrationManager::get_version(&conn).unwrap(), CURRENT_VERSION);
        for table in ["projects", "records", "todos"] {
            assert!(table_exists(&conn, table), "missing table {}", table);
        }
    }

    #[test]
    fn test_unassigned_project_is_seeded() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::initialize(&conn).unwrap();

        let name: String = conn
            .query_row("SELECT name FROM projects WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(name, "Not assigned");
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::initialize(&conn).unwrap();
        MigrationManager::initialize(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, CURRENT_VERSION as i64);
    }

    #[test]
    fn test_sibling_names_are_unique() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::initialize(&conn).unwrap();

        conn.execute("INSERT INTO projects (parent, name) VALUES (NULL, 'Work')", [])
            .unwrap();
        assert!(conn
            .execute("INSERT INTO projects (parent, name) VALUES (NULL, 'Work')", [])
            .is_err());
        conn.execute("INSERT INTO projects (parent, name) VALUES (2, 'Work')", [])
            .unwrap();
    }
}
