//! Context assembly for a new generation/edit request (§4.10
//! "get_context_for_generation").

use forge_protocol::memory::MemoryKind;

use crate::store::MemoryStore;
use crate::MemoryError;

const RECENT_DECISIONS: usize = 5;
const MATCHING_PREFERENCES: usize = 5;
const SIMILAR_CODE_SNIPPETS: usize = 5;
const ACTIVE_CONSTRAINTS: usize = 10;

/// Performs the scoped searches named in §4.10, concatenates them under
/// delimited section headers, and caps the result to `char_budget`
/// characters so the LLM context window stays protected.
pub fn get_context_for_generation(
    store: &MemoryStore,
    project_id: &str,
    new_spec: &str,
    char_budget: usize,
) -> Result<String, MemoryError> {
    let mut sections = Vec::new();

    let decisions = store.search_decisions(project_id, new_spec, RECENT_DECISIONS)?;
    if !decisions.is_empty() {
        let mut section = String::from("## Prior decisions\n");
        for scored in &decisions {
            if let MemoryKind::Decision { title, reasoning, .. } = &scored.record.kind {
                section.push_str(&format!("- {title}: {reasoning}\n"));
            }
        }
        sections.push(section);
    }

    let preferences = store.search_preferences(project_id, new_spec, MATCHING_PREFERENCES)?;
    if !preferences.is_empty() {
        let mut section = String::from("## Preferences\n");
        for scored in &preferences {
            if let MemoryKind::Preference { category, key, value } = &scored.record.kind {
                section.push_str(&format!("- {category}.{key} = {value}\n"));
            }
        }
        sections.push(section);
    }

    let code = store.search_code(project_id, new_spec, SIMILAR_CODE_SNIPPETS, None)?;
    if !code.is_empty() {
        let mut section = String::from("## Related code\n");
        for scored in &code {
            if let MemoryKind::Code { filepath, snippet, .. } = &scored.record.kind {
                let preview: String = snippet.chars().take(200).collect();
                section.push_str(&format!("- {filepath}: {preview}\n"));
            }
        }
        sections.push(section);
    }

    let constraints = store.search_constraints(project_id, new_spec, ACTIVE_CONSTRAINTS)?;
    if !constraints.is_empty() {
        let mut section = String::from("## Active constraints\n");
        for scored in &constraints {
            if let MemoryKind::Constraint { description, severity } = &scored.record.kind {
                section.push_str(&format!("- [{severity}] {description}\n"));
            }
        }
        sections.push(section);
    }

    let mut context = sections.join("\n");
    if context.len() > char_budget {
        context.truncate(char_budget);
    }
    Ok(context)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn context_is_capped_to_budget() {
        let store = MemoryStore::new(crate::db::open_in_memory().unwrap());
        for i in 0..20 {
            store
                .store_decision("proj-1", &format!("decision {i}"), "a fairly long reasoning string")
                .unwrap();
        }
        let context = get_context_for_generation(&store, "proj-1", "decision", 200).unwrap();
        assert!(context.len() <= 200);
    }

    #[test]
    fn empty_memory_yields_empty_context() {
        let store = MemoryStore::new(crate::db::open_in_memory().unwrap());
        let context = get_context_for_generation(&store, "proj-1", "anything", 4096).unwrap();
        assert!(context.is_empty());
    }
}
