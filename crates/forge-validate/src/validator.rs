//! The `Validator` plugin contract (§4.8).

use std::collections::BTreeMap;

use async_trait::async_trait;
use forge_protocol::validation::ValidationResult;

/// One pluggable check over a file set. Implementations declare which
/// extensions they apply to; the pipeline only runs a validator when at
/// least one submitted file matches.
#[async_trait]
pub trait Validator: Send + Sync {
    fn name(&self) -> &'static str;

    fn applicable_extensions(&self) -> &'static [&'static str];

    async fn validate(&self, files: &BTreeMap<String, String>) -> ValidationResult;

    /// Optional auto-fix: given the same file set, return the subset of
    /// files this validator can rewrite to resolve its own fixable
    /// issues. Validators with no auto-fix capability return `None`.
    async fn auto_fix(&self, _files: &BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
        None
    }

    /// Whether this validator's external tool is present on the host.
    /// Mandatory (bundled-parser) validators always answer `true`;
    /// optional validators probe their binary.
    async fn is_available(&self) -> bool {
        true
    }
}

pub(crate) fn applies_to(validator: &dyn Validator, files: &BTreeMap<String, String>) -> bool {
    let extensions = validator.applicable_extensions();
    files
        .keys()
        .any(|path| extensions.iter().any(|ext| path.ends_with(ext)))
}
