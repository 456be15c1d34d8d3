//! Connection pool and schema setup for the project memory store.
//!
//! A `r2d2` pool over `rusqlite`, with WAL mode and a handful of pragmas
//! tuned for a mostly-append, read-heavy workload.

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::MemoryError;

pub type DbPool = Pool<SqliteConnectionManager>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS memory_records (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    kind_json TEXT NOT NULL,
    embedding BLOB NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_memory_records_project ON memory_records(project_id);
";

#[derive(Debug)]
struct ConnectionCustomizer;

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
    }
}

/// Opens (creating if needed) the project-memory database at `db_path`
/// and ensures the schema exists (§4.10 "persisted to a dedicated
/// directory").
pub fn open(db_path: &Path) -> Result<DbPool, MemoryError> {
    let manager = SqliteConnectionManager::file(db_path);
    let pool = Pool::builder()
        .max_size(8)
        .min_idle(Some(1))
        .connection_customizer(Box::new(ConnectionCustomizer))
        .build(manager)
        .map_err(|e| MemoryError::Pool(e.to_string()))?;

    let conn = pool.get().map_err(|e| MemoryError::Pool(e.to_string()))?;
    conn.execute_batch(SCHEMA)
        .map_err(|e| MemoryError::Db(e.to_string()))?;
    Ok(pool)
}

/// Opens an in-memory database, for tests and ephemeral projects.
pub fn open_in_memory() -> Result<DbPool, MemoryError> {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .map_err(|e| MemoryError::Pool(e.to_string()))?;
    let conn = pool.get().map_err(|e| MemoryError::Pool(e.to_string()))?;
    conn.execute_batch(SCHEMA)
        .map_err(|e| MemoryError::Db(e.to_string()))?;
    Ok(pool)
}
