//! Preview environment shapes (§3 `PreviewEnvironment`, §4.9).

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PreviewStatus {
    Creating,
    Running,
    Stopped,
    Error,
}

/// Project type detected by file signature (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectType {
    PythonService,
    ReactSpa,
    NodeService,
    StaticSite,
}

const LOG_RING_CAPACITY: usize = 256;

/// A bounded ring buffer of log lines (ambient-stack addition: a
/// bounded-buffer logging idiom rather than an unbounded `Vec`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LogRingBuffer {
    lines: VecDeque<String>,
}

impl LogRingBuffer {
    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() >= LOG_RING_CAPACITY {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    pub fn tail(&self, n: usize) -> Vec<String> {
        self.lines.iter().rev().take(n).rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PreviewEnvironment {
    pub project_id: String,
    pub preview_id: String,
    /// Opaque handle to the underlying container (e.g. a Docker container
    /// id); `None` before the build step completes.
    pub container_handle: Option<String>,
    pub status: PreviewStatus,
    pub port: Option<u16>,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub logs: LogRingBuffer,
    pub error: Option<String>,
}

impl PreviewEnvironment {
    pub fn new(project_id: impl Into<String>, preview_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            project_id: project_id.into(),
            preview_id: preview_id.into(),
            container_handle: None,
            status: PreviewStatus::Creating,
            port: None,
            url: None,
            created_at: now,
            last_accessed: now,
            logs: LogRingBuffer::default(),
            error: None,
        }
    }

    /// §3 lifetime: 1h hard expiry or 30min idle expiry, whichever first.
    pub fn is_expired(&self, now: DateTime<Utc>, hard_ttl: chrono::Duration, idle_ttl: chrono::Duration) -> bool {
        now - self.created_at >= hard_ttl || now - self.last_accessed >= idle_ttl
    }
}

/// A reload event pushed through the commit callback registry (§4.9,
/// §9 "cyclic data" design note).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReloadEvent {
    pub project_id: String,
    pub preview_id: String,
    pub commit_id: String,
    pub at: DateTime<Utc>,
}
