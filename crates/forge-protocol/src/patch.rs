//! Minimal structure-aware description of a file change (§3 `Patch`,
//! §4.7). The patch *generator* and *applier* live in `forge-patch`; this
//! module only owns the tagged-variant shape so other crates can pattern
//! match on a patch without a dependency on `tree-sitter`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Patch {
    FullReplace { content: String },
    FunctionAdd { name: String, source: String },
    FunctionReplace { name: String, source: String },
    ClassAdd { name: String, source: String },
    ClassReplace { name: String, source: String },
}

impl Patch {
    /// Name of the targeted definition, if this patch variant names one.
    /// `FullReplace` targets the whole file, so it has none.
    pub fn target_name(&self) -> Option<&str> {
        match self {
            Patch::FullReplace { .. } => None,
            Patch::FunctionAdd { name, .. }
            | Patch::FunctionReplace { name, .. }
            | Patch::ClassAdd { name, .. }
            | Patch::ClassReplace { name, .. } => Some(name),
        }
    }

    pub fn is_full_replace(&self) -> bool {
        matches!(self, Patch::FullReplace { .. })
    }
}
