//! In-memory tree with commit history, diffs, and branches (§4.6).
//!
//! The VFS is the sole writer for a project's file tree: every mutation
//! goes through [`Vfs::write_file`] / [`Vfs::delete_file`], and becomes
//! durable only once [`Vfs::commit`] snapshots the tree.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use forge_protocol::vfs::{CommitSummary, DiffEntry, FileNode, FileStatus, VfsStatus};
use sha1::{Digest, Sha1};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VfsError {
    #[error("unknown commit id {0}")]
    UnknownCommit(String),
    #[error("unknown branch {0}")]
    UnknownBranch(String),
    #[error("io error during {operation}: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("path {0:?} escapes the export directory")]
    UnsafePath(String),
}

pub type VfsResult<T> = Result<T, VfsError>;

#[derive(Debug, Clone)]
struct Commit {
    id: String,
    parent_id: Option<String>,
    message: String,
    timestamp: DateTime<Utc>,
    /// Deep-copy snapshot of the tree at commit time; all statuses reset
    /// to `Unchanged` per §4.6.
    tree: BTreeMap<String, FileNode>,
}

/// Versioned in-memory file system for a single project.
pub struct Vfs {
    project_id: String,
    working_tree: BTreeMap<String, FileNode>,
    commits: Vec<Commit>,
    current_commit: Option<String>,
    current_branch: String,
    branches: BTreeMap<String, String>,
}

impl Vfs {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            working_tree: BTreeMap::new(),
            commits: Vec::new(),
            current_commit: None,
            current_branch: "main".to_string(),
            branches: BTreeMap::new(),
        }
    }

    /// Create as `Added`, or transition `Unchanged` -> `Modified` only if
    /// content actually changed (§4.6).
    pub fn write_file(&mut self, path: &str, content: impl Into<String>) {
        let content = content.into();
        let now = Utc::now();
        match self.working_tree.get_mut(path) {
            Some(node) => {
                if node.content != content {
                    node.content = content;
                    node.status = FileStatus::Modified;
                    node.modified_at = now;
                }
            }
            None => {
                self.working_tree.insert(
                    path.to_string(),
                    FileNode {
                        path: path.to_string(),
                        content,
                        status: FileStatus::Added,
                        created_at: now,
                        modified_at: now,
                    },
                );
            }
        }
    }

    pub fn read_file(&self, path: &str) -> Option<&str> {
        self.working_tree.get(path).and_then(|node| {
            (node.status != FileStatus::Deleted).then_some(node.content.as_str())
        })
    }

    /// Mark deleted; excluded from exports (§4.6). No-op if the path was
    /// never tracked.
    pub fn delete_file(&mut self, path: &str) {
        if let Some(node) = self.working_tree.get_mut(path) {
            node.status = FileStatus::Deleted;
            node.modified_at = Utc::now();
        }
    }

    /// `id = first 8 hex chars of sha1(project_id || iso-timestamp)`.
    fn compute_commit_id(&self, timestamp: DateTime<Utc>) -> String {
        let mut hasher = Sha1::new();
        hasher.update(self.project_id.as_bytes());
        hasher.update(timestamp.to_rfc3339().as_bytes());
        let digest = hasher.finalize();
        hex_prefix(&digest, 8)
    }

    /// Deep-copy the non-deleted tree with statuses reset to `Unchanged`;
    /// link parent id; record in history; update the branch pointer
    /// (§4.6).
    pub fn commit(&mut self, message: impl Into<String>) -> VfsResult<String> {
        let timestamp = Utc::now();
        let mut id = self.compute_commit_id(timestamp);
        // Guard against a same-instant collision (commit ids must be
        // unique in a project's history) by perturbing the hash input.
        let mut salt = 0u32;
        while self.commits.iter().any(|c| c.id == id) {
            salt += 1;
            let mut hasher = Sha1::new();
            hasher.update(self.project_id.as_bytes());
            hasher.update(timestamp.to_rfc3339().as_bytes());
            hasher.update(salt.to_be_bytes());
            id = hex_prefix(&hasher.finalize(), 8);
        }

        let snapshot: BTreeMap<String, FileNode> = self
            .working_tree
            .iter()
            .filter(|(_, node)| node.status != FileStatus::Deleted)
            .map(|(path, node)| {
                let mut node = node.clone();
                node.status = FileStatus::Unchanged;
                (path.clone(), node)
            })
            .collect();

        let commit = Commit {
            id: id.clone(),
            parent_id: self.current_commit.clone(),
            message: message.into(),
            timestamp,
            tree: snapshot.clone(),
        };
        self.commits.push(commit);
        self.working_tree = snapshot;
        self.current_commit = Some(id.clone());
        self.branches.insert(self.current_branch.clone(), id.clone());
        Ok(id)
    }

    /// Restore the tree from a prior snapshot; current commit id advances
    /// to the target. No implicit squash (§4.6) — history keeps every
    /// commit made after `commit_id`.
    pub fn rollback(&mut self, commit_id: &str) -> VfsResult<()> {
        let commit = self
            .commits
            .iter()
            .find(|c| c.id == commit_id)
            .ok_or_else(|| VfsError::UnknownCommit(commit_id.to_string()))?;
        self.working_tree = commit.tree.clone();
        self.current_commit = Some(commit_id.to_string());
        self.branches
            .insert(self.current_branch.clone(), commit_id.to_string());
        Ok(())
    }

    /// Branches share commit history: creating one just names the
    /// current commit (§4.6).
    pub fn branch(&mut self, name: &str) {
        let target = self
            .current_commit
            .clone()
            .unwrap_or_else(|| "".to_string());
        self.branches.insert(name.to_string(), target);
    }

    pub fn checkout(&mut self, name: &str) -> VfsResult<()> {
        let commit_id = self
            .branches
            .get(name)
            .cloned()
            .ok_or_else(|| VfsError::UnknownBranch(name.to_string()))?;
        self.current_branch = name.to_string();
        if !commit_id.is_empty() {
            self.rollback(&commit_id)?;
        }
        Ok(())
    }

    /// Produce a per-path record; without `from_commit`, diff against
    /// empty (§4.6).
    pub fn get_diff(&self, from_commit: Option<&str>) -> VfsResult<Vec<DiffEntry>> {
        let baseline: BTreeMap<String, FileNode> = match from_commit {
            Some(id) => self
                .commits
                .iter()
                .find(|c| c.id == id)
                .ok_or_else(|| VfsError::UnknownCommit(id.to_string()))?
                .tree
                .clone(),
            None => BTreeMap::new(),
        };

        let mut entries = Vec::new();
        let mut paths: Vec<&String> = baseline.keys().chain(self.working_tree.keys()).collect();
        paths.sort();
        paths.dedup();

        for path in paths {
            let old = baseline.get(path);
            let new = self
                .working_tree
                .get(path)
                .filter(|n| n.status != FileStatus::Deleted);
            let status = match (old, new) {
                (None, Some(_)) => FileStatus::Added,
                (Some(_), None) => FileStatus::Deleted,
                (Some(o), Some(n)) if o.content != n.content => FileStatus::Modified,
                (Some(_), Some(_)) => FileStatus::Unchanged,
                (None, None) => continue,
            };
            entries.push(DiffEntry {
                path: path.clone(),
                status,
                old_content: old.map(|n| n.content.clone()),
                new_content: new.map(|n| n.content.clone()),
            });
        }
        Ok(entries)
    }

    /// Materialise the current (committed) tree to `dir`.
    pub fn export_to_disk(&self, dir: &std::path::Path) -> VfsResult<()> {
        for (path, node) in &self.working_tree {
            if node.status == FileStatus::Deleted {
                continue;
            }
            let dest = forge_protocol::path_safety::safe_relative_join(dir, path)
                .ok_or_else(|| VfsError::UnsafePath(path.clone()))?;
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent).map_err(|source| VfsError::Io {
                    operation: "create_dir_all",
                    source,
                })?;
            }
            std::fs::write(&dest, &node.content).map_err(|source| VfsError::Io {
                operation: "write",
                source,
            })?;
        }
        Ok(())
    }

    /// Ingest every regular file under `dir`, recorded relative to `dir`.
    pub fn import_from_disk(&mut self, dir: &std::path::Path) -> VfsResult<()> {
        for entry in walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let relative = entry
                .path()
                .strip_prefix(dir)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            let content = std::fs::read_to_string(entry.path()).map_err(|source| VfsError::Io {
                operation: "read_to_string",
                source,
            })?;
            self.write_file(&relative, content);
        }
        Ok(())
    }

    pub fn get_status(&self) -> VfsStatus {
        let mut added = 0;
        let mut modified = 0;
        let mut deleted = 0;
        let mut unchanged = 0;
        for node in self.working_tree.values() {
            match node.status {
                FileStatus::Added => added += 1,
                FileStatus::Modified => modified += 1,
                FileStatus::Deleted => deleted += 1,
                FileStatus::Unchanged => unchanged += 1,
            }
        }
        VfsStatus {
            current_commit: self.current_commit.clone(),
            current_branch: self.current_branch.clone(),
            added,
            modified,
            deleted,
            unchanged,
        }
    }

    pub fn get_history(&self) -> Vec<CommitSummary> {
        self.commits
            .iter()
            .map(|c| CommitSummary {
                id: c.id.clone(),
                parent_id: c.parent_id.clone(),
                message: c.message.clone(),
                timestamp: c.timestamp,
                file_count: c.tree.len(),
            })
            .collect()
    }

    pub fn current_files(&self) -> BTreeMap<String, String> {
        self.working_tree
            .iter()
            .filter(|(_, node)| node.status != FileStatus::Deleted)
            .map(|(path, node)| (path.clone(), node.content.clone()))
            .collect()
    }

    pub fn current_commit_id(&self) -> Option<&str> {
        self.current_commit.as_deref()
    }
}

fn hex_prefix(bytes: &[u8], chars: usize) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<String>()
        .chars()
        .take(chars)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn write_then_commit_round_trips() {
        let mut vfs = Vfs::new("proj-1");
        vfs.write_file("main.py", "print('hi')");
        let commit_id = vfs.commit("initial").unwrap();
        assert_eq!(vfs.read_file("main.py"), Some("print('hi')"));
        assert_eq!(vfs.current_commit_id(), Some(commit_id.as_str()));
        assert_eq!(vfs.get_status().added, 0);
        assert_eq!(vfs.get_status().unchanged, 1);
    }

    #[test]
    fn unchanged_write_does_not_flip_status() {
        let mut vfs = Vfs::new("proj-1");
        vfs.write_file("a.py", "x = 1");
        vfs.commit("c1").unwrap();
        vfs.write_file("a.py", "x = 1");
        assert_eq!(vfs.get_status().modified, 0);
    }

    #[test]
    fn rollback_restores_prior_tree_without_squashing_history() {
        let mut vfs = Vfs::new("proj-1");
        vfs.write_file("a.py", "v1");
        let c1 = vfs.commit("c1").unwrap();
        vfs.write_file("a.py", "v2");
        vfs.commit("c2").unwrap();

        vfs.rollback(&c1).unwrap();
        assert_eq!(vfs.read_file("a.py"), Some("v1"));
        assert_eq!(vfs.get_history().len(), 2);
    }

    #[test]
    fn delete_excludes_from_export_and_diff() {
        let mut vfs = Vfs::new("proj-1");
        vfs.write_file("a.py", "v1");
        vfs.commit("c1").unwrap();
        vfs.delete_file("a.py");
        assert_eq!(vfs.read_file("a.py"), None);
        let diff = vfs.get_diff(Some(&vfs.get_history()[0].id.clone())).unwrap();
        let entry = diff.iter().find(|e| e.path == "a.py").unwrap();
        assert_eq!(entry.status, FileStatus::Deleted);
    }

    #[test]
    fn export_then_import_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut vfs = Vfs::new("proj-1");
        vfs.write_file("src/main.py", "print(1)");
        vfs.write_file("README.md", "hello");
        vfs.commit("c1").unwrap();
        vfs.export_to_disk(dir.path()).unwrap();

        let mut imported = Vfs::new("proj-2");
        imported.import_from_disk(dir.path()).unwrap();
        assert_eq!(imported.read_file("src/main.py"), Some("print(1)"));
        assert_eq!(imported.read_file("README.md"), Some("hello"));
    }

    #[test]
    fn branch_and_checkout_share_history() {
        let mut vfs = Vfs::new("proj-1");
        vfs.write_file("a.py", "v1");
        vfs.commit("c1").unwrap();
        vfs.branch("feature");
        vfs.checkout("feature").unwrap();
        vfs.write_file("a.py", "v2");
        let c2 = vfs.commit("c2 on feature").unwrap();

        vfs.checkout("main").unwrap();
        assert_eq!(vfs.read_file("a.py"), Some("v1"));
        assert!(vfs.get_history().iter().any(|c| c.id == c2));
    }

    #[test]
    fn commit_ids_are_unique() {
        let mut vfs = Vfs::new("proj-1");
        vfs.write_file("a.py", "v1");
        let c1 = vfs.commit("c1").unwrap();
        vfs.write_file("a.py", "v2");
        let c2 = vfs.commit("c2").unwrap();
        assert_ne!(c1, c2);
    }
}
