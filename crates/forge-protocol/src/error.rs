//! Taxonomy of error kinds shared across the engine (§7).
//!
//! Each component raises only from this list; unexpected faults (disk I/O
//! panics, for example) are deliberately *not* folded in here — per §7 those
//! are allowed to crash the owning task and get restarted by the supervisor,
//! rather than being coerced into a recoverable variant.

use thiserror::Error;

/// The engine-wide error type. Component crates define their own narrower
/// error enums for internal use and convert into this one with `#[from]`
/// at the boundary, the same layering used elsewhere for grouping a
/// family of narrower error enums under one umbrella type.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// Credentials missing or the provider is circuit-broken.
    /// Recovered locally by the Router selecting a fallback; surfaced only
    /// if no provider remains for the task.
    #[error("no provider available for task {task:?}")]
    ProviderUnavailable { task: crate::agent::TaskType },

    /// Retryable upstream failure (timeout, 5xx, transport error).
    #[error("transient provider failure on {provider}: {message}")]
    ProviderTransient { provider: String, message: String },

    /// Malformed response body or authentication failure. No retry on
    /// this provider.
    #[error("fatal provider failure on {provider}: {message}")]
    ProviderFatal { provider: String, message: String },

    /// Manifest or JSON contract violation.
    #[error("schema invalid: {0}")]
    SchemaInvalid(String),

    /// AST patch could not be applied to the prior content.
    #[error("patch inapplicable to {path}: {reason}")]
    PatchInapplicable { path: String, reason: String },

    /// At least one Error-severity validation issue survived the repair
    /// budget.
    #[error("validation failed with {error_count} error(s) after {attempts} repair attempt(s)")]
    ValidationFailed { error_count: usize, attempts: u32 },

    /// Container build or health probe failure.
    #[error("preview build failed: {0}")]
    PreviewBuildFailed(String),

    /// No ports, too many concurrent previews, disk full.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Operation was cancelled before completing.
    #[error("cancelled")]
    Cancelled,

    /// Operation exceeded its allotted timeout.
    #[error("timed out after {0:?}")]
    TimedOut(std::time::Duration),
}

pub type ForgeResult<T> = Result<T, ForgeError>;
