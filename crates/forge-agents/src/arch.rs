//! The Arch agent: manifest → [`ArchitectureSpec`] (§4.4 "Arch").

use forge_llm::adapter::CompletionRequest;
use forge_llm::Router;
use forge_protocol::agent::{AgentContext, AgentMessage, Role};
use forge_protocol::manifest::{ArchitectureSpec, ProjectManifest};

use crate::extractor::extract_json;
use crate::prompts::system_prompt;

pub struct ArchOutcome {
    pub spec: ArchitectureSpec,
    pub message: AgentMessage,
}

fn user_prompt(context: &AgentContext, manifest: &ProjectManifest) -> String {
    format!(
        "Project manifest (JSON):\n{}\n",
        serde_json::to_string_pretty(manifest).unwrap_or_default()
    ) + &format!("Original specification:\n{}\n", context.spec)
}

fn pass_through(manifest: ProjectManifest, reason: &str) -> ArchOutcome {
    let spec = ArchitectureSpec {
        manifest,
        file_purposes: Default::default(),
        scaling_notes: None,
    };
    let message = AgentMessage::new(
        Role::Arch,
        "Passed the manifest through unchanged.",
        reason,
        0.3,
        Default::default(),
    );
    ArchOutcome { spec, message }
}

/// Runs the Arch agent (§4.5 generate step 3, first in `GENERATE_ORDER`).
/// "Fails soft by passing the manifest through unchanged" (§4.4) — no
/// error is ever returned, only a lower-confidence [`ArchOutcome`].
pub async fn run_arch(router: &Router, context: &AgentContext, manifest: &ProjectManifest) -> ArchOutcome {
    let request = CompletionRequest::new(user_prompt(context, manifest), system_prompt(Role::Arch));

    let completion = match router.complete(Role::Arch.task_type(), request).await {
        Ok(response) => response,
        Err(error) => {
            tracing::warn!(%error, "Arch agent: no provider available, passing manifest through");
            return pass_through(manifest.clone(), "router returned no provider for the Reasoning task");
        }
    };

    match extract_json::<ArchitectureSpec>(&completion.text) {
        Some(spec) => {
            let message = AgentMessage::new(
                Role::Arch,
                "Refined the manifest into an architecture spec.",
                "architecture JSON parsed successfully",
                0.85,
                Default::default(),
            );
            ArchOutcome { spec, message }
        }
        None => {
            tracing::warn!("Arch agent: LLM output was not parseable JSON, passing manifest through");
            pass_through(manifest.clone(), "tolerant JSON extraction failed on the raw completion")
        }
    }
}
