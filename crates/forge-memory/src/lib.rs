//! Per-project vector memory of code, decisions, preferences, and
//! constraints (C10, §4.10).

pub mod context;
pub mod db;
pub mod embedding;
pub mod store;

pub use context::get_context_for_generation;
pub use store::MemoryStore;

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("connection pool error: {0}")]
    Pool(String),
    #[error("database error: {0}")]
    Db(String),
    #[error("serialization error: {0}")]
    Serde(String),
}

/// Resolves the on-disk directory a project's memory database lives in
/// (§4.10 "persisted to a dedicated directory"), creating it if absent.
pub fn project_memory_dir(base_dir: &Path, project_id: &str) -> std::io::Result<PathBuf> {
    let dir = base_dir.join("memory").join(project_id);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Opens the [`MemoryStore`] for a project, creating its database file
/// under `base_dir` on first use (§4.10 "created on first store").
pub fn open_project_store(base_dir: &Path, project_id: &str) -> Result<MemoryStore, MemoryError> {
    let dir = project_memory_dir(base_dir, project_id).map_err(|e| MemoryError::Db(e.to_string()))?;
    let pool = db::open(&dir.join("memory.sqlite3"))?;
    Ok(MemoryStore::new(pool))
}

/// Deletes a project's entire memory directory (§4.10 "deleted on
/// project deletion").
pub fn delete_project_memory(base_dir: &Path, project_id: &str) -> std::io::Result<()> {
    let dir = base_dir.join("memory").join(project_id);
    if dir.exists() {
        std::fs::remove_dir_all(dir)?;
    }
    Ok(())
}
