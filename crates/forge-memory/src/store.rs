//! Persistent CRUD over [`MemoryRecord`]s (§4.10 store/search operations).

use chrono::Utc;
use forge_protocol::memory::{MemoryKind, MemoryRecord, ScoredMemory};
use rusqlite::params;

use crate::db::DbPool;
use crate::embedding::{cosine_similarity, embed};
use crate::MemoryError;

pub struct MemoryStore {
    pool: DbPool,
}

impl MemoryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, kind), fields(project_id))]
    fn insert(&self, project_id: &str, kind: MemoryKind) -> Result<MemoryRecord, MemoryError> {
        let embedding = embed(&kind.embedding_text());
        let record = MemoryRecord {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            kind,
            embedding,
            created_at: Utc::now(),
        };

        let conn = self.pool.get().map_err(|e| {
            tracing::warn!(%e, "failed to acquire memory db connection");
            MemoryError::Pool(e.to_string())
        })?;
        let kind_json = serde_json::to_string(&record.kind).map_err(|e| MemoryError::Serde(e.to_string()))?;
        let embedding_bytes =
            serde_json::to_vec(&record.embedding).map_err(|e| MemoryError::Serde(e.to_string()))?;
        conn.execute(
            "INSERT INTO memory_records (id, project_id, kind_json, embedding, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id,
                record.project_id,
                kind_json,
                embedding_bytes,
                record.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| {
            tracing::warn!(%e, "failed to insert memory record");
            MemoryError::Db(e.to_string())
        })?;

        tracing::debug!(record_id = %record.id, "stored memory record");
        Ok(record)
    }

    pub fn store_code(
        &self,
        project_id: &str,
        filepath: &str,
        snippet: &str,
        language: &str,
    ) -> Result<MemoryRecord, MemoryError> {
        self.insert(
            project_id,
            MemoryKind::Code {
                filepath: filepath.to_string(),
                language: language.to_string(),
                snippet: snippet.to_string(),
            },
        )
    }

    pub fn store_decision(
        &self,
        project_id: &str,
        title: &str,
        reasoning: &str,
    ) -> Result<MemoryRecord, MemoryError> {
        self.insert(
            project_id,
            MemoryKind::Decision {
                title: title.to_string(),
                reasoning: reasoning.to_string(),
                timestamp: Utc::now(),
            },
        )
    }

    pub fn store_preference(
        &self,
        project_id: &str,
        category: &str,
        key: &str,
        value: &str,
    ) -> Result<MemoryRecord, MemoryError> {
        self.insert(
            project_id,
            MemoryKind::Preference {
                category: category.to_string(),
                key: key.to_string(),
                value: value.to_string(),
            },
        )
    }

    pub fn store_constraint(
        &self,
        project_id: &str,
        description: &str,
        severity: &str,
    ) -> Result<MemoryRecord, MemoryError> {
        self.insert(
            project_id,
            MemoryKind::Constraint {
                description: description.to_string(),
                severity: severity.to_string(),
            },
        )
    }

    /// All records for a project, newest first. The in-process brute-force
    /// scan backing `search_*` (§4.10 "cosine similarity... top-n").
    fn load_project_records(&self, project_id: &str) -> Result<Vec<MemoryRecord>, MemoryError> {
        let conn = self.pool.get().map_err(|e| MemoryError::Pool(e.to_string()))?;
        let mut statement = conn
            .prepare(
                "SELECT id, project_id, kind_json, embedding, created_at FROM memory_records
                 WHERE project_id = ?1 ORDER BY created_at DESC",
            )
            .map_err(|e| MemoryError::Db(e.to_string()))?;

        let rows = statement
            .query_map(params![project_id], |row| {
                let id: String = row.get(0)?;
                let project_id: String = row.get(1)?;
                let kind_json: String = row.get(2)?;
                let embedding_bytes: Vec<u8> = row.get(3)?;
                let created_at: String = row.get(4)?;
                Ok((id, project_id, kind_json, embedding_bytes, created_at))
            })
            .map_err(|e| MemoryError::Db(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            let (id, project_id, kind_json, embedding_bytes, created_at) =
                row.map_err(|e| MemoryError::Db(e.to_string()))?;
            let kind: MemoryKind =
                serde_json::from_str(&kind_json).map_err(|e| MemoryError::Serde(e.to_string()))?;
            let embedding: Vec<f32> =
                serde_json::from_slice(&embedding_bytes).map_err(|e| MemoryError::Serde(e.to_string()))?;
            let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| MemoryError::Serde(e.to_string()))?
                .with_timezone(&Utc);
            records.push(MemoryRecord {
                id,
                project_id,
                kind,
                embedding,
                created_at,
            });
        }
        Ok(records)
    }

    fn search_kind(
        &self,
        project_id: &str,
        query: &str,
        n: usize,
        filter: impl Fn(&MemoryKind) -> bool,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        let query_embedding = embed(query);
        let mut scored: Vec<ScoredMemory> = self
            .load_project_records(project_id)?
            .into_iter()
            .filter(|record| filter(&record.kind))
            .map(|record| {
                let score = cosine_similarity(&query_embedding, &record.embedding);
                ScoredMemory { record, score }
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(n);
        Ok(scored)
    }

    pub fn search_code(
        &self,
        project_id: &str,
        query: &str,
        n: usize,
        language: Option<&str>,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        self.search_kind(project_id, query, n, |kind| match kind {
            MemoryKind::Code { language: l, .. } => language.map_or(true, |wanted| wanted == l),
            _ => false,
        })
    }

    pub fn search_decisions(&self, project_id: &str, query: &str, n: usize) -> Result<Vec<ScoredMemory>, MemoryError> {
        self.search_kind(project_id, query, n, |kind| matches!(kind, MemoryKind::Decision { .. }))
    }

    pub fn search_preferences(&self, project_id: &str, query: &str, n: usize) -> Result<Vec<ScoredMemory>, MemoryError> {
        self.search_kind(project_id, query, n, |kind| matches!(kind, MemoryKind::Preference { .. }))
    }

    pub fn search_constraints(&self, project_id: &str, query: &str, n: usize) -> Result<Vec<ScoredMemory>, MemoryError> {
        self.search_kind(project_id, query, n, |kind| matches!(kind, MemoryKind::Constraint { .. }))
    }

    /// Deletes every record for a project (§4.10 "deleted on project
    /// deletion").
    pub fn delete_project(&self, project_id: &str) -> Result<(), MemoryError> {
        let conn = self.pool.get().map_err(|e| MemoryError::Pool(e.to_string()))?;
        conn.execute(
            "DELETE FROM memory_records WHERE project_id = ?1",
            params![project_id],
        )
        .map_err(|e| MemoryError::Db(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new(crate::db::open_in_memory().unwrap())
    }

    #[test]
    fn store_and_search_code_round_trips() {
        let store = store();
        store
            .store_code("proj-1", "auth.py", "def login(user, password): ...", "python")
            .unwrap();
        store
            .store_code("proj-1", "styles.css", ".button { color: red }", "css")
            .unwrap();

        let results = store.search_code("proj-1", "login password", 5, Some("python")).unwrap();
        assert_eq!(results.len(), 1);
        assert!(matches!(&results[0].record.kind, MemoryKind::Code { filepath, .. } if filepath == "auth.py"));
    }

    #[test]
    fn search_is_scoped_to_project() {
        let store = store();
        store.store_decision("proj-1", "use jwt", "stateless auth").unwrap();
        store.store_decision("proj-2", "use sessions", "simpler revocation").unwrap();

        let results = store.search_decisions("proj-1", "auth", 10).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn delete_project_removes_all_its_records() {
        let store = store();
        store.store_constraint("proj-1", "no external network calls", "high").unwrap();
        store.delete_project("proj-1").unwrap();
        let results = store.search_constraints("proj-1", "network", 10).unwrap();
        assert!(results.is_empty());
    }
}
