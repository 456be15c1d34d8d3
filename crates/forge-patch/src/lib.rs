//! Structure-preserving minimal edits for iterative changes (§4.7).
//!
//! Compares the top-level function/class definitions of two file
//! versions and reduces the change to the smallest [`Patch`] variant
//! that still applies cleanly; anything ambiguous degrades to
//! `full_replace`.

use std::collections::BTreeMap;

use forge_protocol::patch::Patch;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    JavaScript,
}

/// Detect a bundled-parser language by extension. Anything else (or no
/// extension) has no supported parser, which forces `full_replace`
/// (§4.7 "non-supported language").
pub fn detect_language(filepath: &str) -> Option<Language> {
    let ext = filepath.rsplit('.').next()?;
    match ext {
        "py" => Some(Language::Python),
        "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
        _ => None,
    }
}

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("parse error in {filepath}: {reason}")]
    Parse { filepath: String, reason: String },
    #[error("definition {name} not found while applying patch")]
    DefinitionMissing { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DefKind {
    Function,
    Class,
}

#[derive(Debug, Clone)]
struct Definition {
    kind: DefKind,
    name: String,
    source: String,
}

fn ts_language(language: Language) -> tree_sitter::Language {
    match language {
        Language::Python => tree_sitter_python::LANGUAGE.into(),
        Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
    }
}

/// Parse `content` into a flat map of top-level definitions, keyed by
/// name. A tree containing a parse error node fails the whole
/// extraction, per §4.7 "parse errors in either input immediately yield
/// full_replace".
fn extract_definitions(
    language: Language,
    content: &str,
) -> Result<BTreeMap<String, Definition>, String> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&ts_language(language))
        .map_err(|e| e.to_string())?;
    let tree = parser
        .parse(content, None)
        .ok_or_else(|| "parser produced no tree".to_string())?;
    let root = tree.root_node();
    if root.has_error() {
        return Err("syntax error".to_string());
    }

    let bytes = content.as_bytes();
    let mut definitions = BTreeMap::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        let kind = match (language, child.kind()) {
            (Language::Python, "function_definition") => DefKind::Function,
            (Language::Python, "class_definition") => DefKind::Class,
            (Language::JavaScript, "function_declaration") => DefKind::Function,
            (Language::JavaScript, "class_declaration") => DefKind::Class,
            _ => continue,
        };
        let Some(name_node) = child.child_by_field_name("name") else {
            continue;
        };
        let Ok(name) = name_node.utf8_text(bytes) else {
            continue;
        };
        let Ok(source) = child.utf8_text(bytes) else {
            continue;
        };
        definitions.insert(
            name.to_string(),
            Definition {
                kind,
                name: name.to_string(),
                source: source.to_string(),
            },
        );
    }
    Ok(definitions)
}

/// Produce the smallest [`Patch`] that turns `old_content` into
/// `new_content` for `filepath` (§4.7).
pub fn diff(filepath: &str, old_content: &str, new_content: &str) -> Patch {
    let Some(language) = detect_language(filepath) else {
        return Patch::FullReplace {
            content: new_content.to_string(),
        };
    };

    let (Ok(old_defs), Ok(new_defs)) = (
        extract_definitions(language, old_content),
        extract_definitions(language, new_content),
    ) else {
        return Patch::FullReplace {
            content: new_content.to_string(),
        };
    };

    let added: Vec<&Definition> = new_defs
        .iter()
        .filter(|(name, _)| !old_defs.contains_key(*name))
        .map(|(_, def)| def)
        .collect();
    let removed_count = old_defs
        .keys()
        .filter(|name| !new_defs.contains_key(*name))
        .count();
    let changed: Vec<&Definition> = new_defs
        .iter()
        .filter_map(|(name, new_def)| {
            old_defs
                .get(name)
                .filter(|old_def| old_def.source != new_def.source)
                .map(|_| new_def)
        })
        .collect();

    if added.len() == 1 && removed_count == 0 && changed.is_empty() {
        let def = added[0];
        return match def.kind {
            DefKind::Function => Patch::FunctionAdd {
                name: def.name.clone(),
                source: def.source.clone(),
            },
            DefKind::Class => Patch::ClassAdd {
                name: def.name.clone(),
                source: def.source.clone(),
            },
        };
    }

    if changed.len() == 1 && added.is_empty() && removed_count == 0 {
        let def = changed[0];
        return match def.kind {
            DefKind::Function => Patch::FunctionReplace {
                name: def.name.clone(),
                source: def.source.clone(),
            },
            DefKind::Class => Patch::ClassReplace {
                name: def.name.clone(),
                source: def.source.clone(),
            },
        };
    }

    Patch::FullReplace {
        content: new_content.to_string(),
    }
}

/// Apply `patch` to `previous_content`, returning the new full file
/// content. Any application failure (definition not found, re-emit
/// failure) falls back to `full_replace` semantics at the call site —
/// this function reports the failure via `PatchError` so the caller can
/// decide (§4.7 "on any application failure, fall back to
/// full_replace").
pub fn apply(filepath: &str, previous_content: &str, patch: &Patch) -> Result<String, PatchError> {
    match patch {
        Patch::FullReplace { content } => Ok(content.clone()),
        Patch::FunctionAdd { source, .. } | Patch::ClassAdd { source, .. } => {
            let mut out = previous_content.to_string();
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(source);
            if !out.ends_with('\n') {
                out.push('\n');
            }
            Ok(out)
        }
        Patch::FunctionReplace { name, source } | Patch::ClassReplace { name, source } => {
            let language = detect_language(filepath).ok_or_else(|| PatchError::Parse {
                filepath: filepath.to_string(),
                reason: "no parser for replace target".to_string(),
            })?;
            let definitions = extract_definitions(language, previous_content).map_err(|reason| {
                PatchError::Parse {
                    filepath: filepath.to_string(),
                    reason,
                }
            })?;
            let target = definitions
                .get(name)
                .ok_or_else(|| PatchError::DefinitionMissing { name: name.clone() })?;
            let span = find_span(previous_content, &target.source)
                .ok_or_else(|| PatchError::DefinitionMissing { name: name.clone() })?;
            let mut out = String::with_capacity(previous_content.len());
            out.push_str(&previous_content[..span.0]);
            out.push_str(source);
            out.push_str(&previous_content[span.1..]);
            Ok(out)
        }
    }
}

fn find_span(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    haystack.find(needle).map(|start| (start, start + needle.len()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const OLD_PY: &str = "def greet():\n    return 'hi'\n";
    const ADD_PY: &str =
        "def greet():\n    return 'hi'\n\ndef farewell():\n    return 'bye'\n";
    const REPLACE_PY: &str = "def greet():\n    return 'hello'\n";

    #[test]
    fn single_new_function_yields_function_add() {
        let patch = diff("app.py", OLD_PY, ADD_PY);
        match patch {
            Patch::FunctionAdd { name, .. } => assert_eq!(name, "farewell"),
            other => panic!("expected function_add, got {other:?}"),
        }
    }

    #[test]
    fn changed_function_body_yields_function_replace() {
        let patch = diff("app.py", OLD_PY, REPLACE_PY);
        match patch {
            Patch::FunctionReplace { name, .. } => assert_eq!(name, "greet"),
            other => panic!("expected function_replace, got {other:?}"),
        }
    }

    #[test]
    fn multiple_simultaneous_changes_fall_back_to_full_replace() {
        let new_content =
            "def greet():\n    return 'hello'\n\ndef farewell():\n    return 'bye'\n";
        let patch = diff("app.py", OLD_PY, new_content);
        assert!(matches!(patch, Patch::FullReplace { .. }));
    }

    #[test]
    fn syntax_error_forces_full_replace() {
        let broken = "def greet(:\n    return\n";
        let patch = diff("app.py", OLD_PY, broken);
        assert!(matches!(patch, Patch::FullReplace { .. }));
    }

    #[test]
    fn unsupported_extension_forces_full_replace() {
        let patch = diff("README.md", "old", "new");
        assert!(matches!(patch, Patch::FullReplace { .. }));
    }

    #[test]
    fn apply_function_add_appends_with_blank_line() {
        let patch = diff("app.py", OLD_PY, ADD_PY);
        let applied = apply("app.py", OLD_PY, &patch).unwrap();
        assert!(applied.contains("def farewell"));
        assert!(applied.contains("\n\ndef farewell"));
    }

    #[test]
    fn apply_function_replace_substitutes_target_only() {
        let patch = diff("app.py", OLD_PY, REPLACE_PY);
        let applied = apply("app.py", OLD_PY, &patch).unwrap();
        assert_eq!(applied, REPLACE_PY);
    }
}
