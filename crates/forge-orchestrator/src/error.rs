//! Orchestrator-local error taxonomy, widened into [`forge_protocol::ForgeError`]
//! at the boundary (§7).

use forge_protocol::ForgeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("no reasoning provider available to plan this project")]
    CoreUnavailable,
    #[error(transparent)]
    Vfs(#[from] forge_vfs::VfsError),
    #[error("unknown project {0}")]
    UnknownProject(String),
    #[error("validation failed with {error_count} error(s) after {attempts} repair attempt(s)")]
    ValidationExhausted { error_count: usize, attempts: u32 },
}

impl OrchestratorError {
    pub fn into_forge_error(self) -> ForgeError {
        match self {
            OrchestratorError::CoreUnavailable => ForgeError::ProviderUnavailable {
                task: forge_protocol::agent::TaskType::Reasoning,
            },
            OrchestratorError::Vfs(error) => ForgeError::SchemaInvalid(error.to_string()),
            OrchestratorError::UnknownProject(id) => ForgeError::SchemaInvalid(format!("unknown project {id}")),
            OrchestratorError::ValidationExhausted { error_count, attempts } => {
                ForgeError::ValidationFailed { error_count, attempts }
            }
        }
    }
}
