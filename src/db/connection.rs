use rusqlite::Connection;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use crate::config::Config;
use crate::db::migrations::MigrationManager;

/// Database connection manager
pub struct DbConnection;

impl DbConnection {
    /// Get the default database path (`$XDG_DATA_HOME/worktime/work.sqlite`)
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = match dirs::data_dir() {
            Some(dir) => dir,
            None => dirs::home_dir()
                .context("Failed to determine home directory")?
                .join(".local")
                .join("share"),
        };
        Ok(data_dir.join("worktime").join("work.sqlite"))
    }

    /// Pick the database path: explicit override, then the rc file, then
    /// the default location
    pub fn resolve_path(override_path: Option<&Path>, config: &Config) -> Result<PathBuf> {
        if let Some(path) = override_path {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = &config.data_location {
            return Ok(path.clone());
        }
        Self::default_path()
    }

    /// Connect to the database, creating it and parent directories if needed
    pub fn connect(db_path: &Path) -> Result<Connection> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        log::debug!("opening database {}", db_path.display());
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;

        Self::prepare(&conn)?;
        Ok(conn)
    }

    /// Connect to an in-memory database (for testing)
    pub fn connect_in_memory() -> Result<Connection> {
        let conn = Connection::open_in_memory()
            .context("Failed to open in-memory database")?;
        Self::prepare(&conn)?;
        Ok(conn)
    }

    fn prepare(conn: &Connection) -> Result<()> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .context("Failed to enable foreign keys")?;
        MigrationManager::initialize(conn)
            .context("Failed to initialize database schema")?;
        Ok(())
    }
}
