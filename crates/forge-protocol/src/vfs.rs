//! Shared VFS data shapes (§3 `FileNode`, `Commit`). The tree/history
//! *engine* lives in `forge-vfs`; this crate only owns the wire-shape so
//! `forge-patch`, `forge-orchestrator`, and `forge-preview` can all speak
//! about a file's status without depending on the VFS engine crate.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Unchanged,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FileNode {
    pub path: String,
    pub content: String,
    pub status: FileStatus,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Per-path diff record produced by `get_diff` (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiffEntry {
    pub path: String,
    pub status: FileStatus,
    pub old_content: Option<String>,
    pub new_content: Option<String>,
}

/// A lightweight summary of one commit, as returned by `get_history`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CommitSummary {
    pub id: String,
    pub parent_id: Option<String>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub file_count: usize,
}

/// A summary of the current working state, as returned by `get_status`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VfsStatus {
    pub current_commit: Option<String>,
    pub current_branch: String,
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
    pub unchanged: usize,
}
