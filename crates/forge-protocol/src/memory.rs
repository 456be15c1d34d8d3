//! Project memory record shapes (§3 `MemoryRecord`, §4.10).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fixed embedding dimensionality for the bundled sentence encoder (§3,
/// §4.10).
pub const EMBEDDING_DIM: usize = 384;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemoryKind {
    Code {
        filepath: String,
        language: String,
        snippet: String,
    },
    Decision {
        title: String,
        reasoning: String,
        timestamp: DateTime<Utc>,
    },
    Preference {
        category: String,
        key: String,
        value: String,
    },
    Constraint {
        description: String,
        severity: String,
    },
}

impl MemoryKind {
    /// The short text representation fed to the embedding model
    /// (§4.10: `"filepath :: first 2 KiB of snippet"` for code, and an
    /// analogous compact form for the other kinds).
    pub fn embedding_text(&self) -> String {
        const SNIPPET_CAP: usize = 2048;
        match self {
            MemoryKind::Code {
                filepath, snippet, ..
            } => {
                let truncated: String = snippet.chars().take(SNIPPET_CAP).collect();
                format!("{filepath} :: {truncated}")
            }
            MemoryKind::Decision { title, reasoning, .. } => {
                format!("{title} :: {reasoning}")
            }
            MemoryKind::Preference { category, key, value } => {
                format!("{category}.{key} = {value}")
            }
            MemoryKind::Constraint {
                description,
                severity,
            } => format!("[{severity}] {description}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MemoryRecord {
    pub id: String,
    pub project_id: String,
    pub kind: MemoryKind,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScoredMemory {
    pub record: MemoryRecord,
    pub score: f32,
}
