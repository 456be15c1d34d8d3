//! The Core agent: spec → [`ProjectManifest`] (§4.4 "Core").

use forge_llm::adapter::CompletionRequest;
use forge_llm::{Router, RouterError};
use forge_protocol::agent::{AgentContext, AgentMessage, Role};
use forge_protocol::manifest::{self, ProjectManifest};

use crate::extractor::extract_json;
use crate::prompts::system_prompt;

/// The manifest the pipeline continues with, alongside the message
/// recording how it was produced.
pub struct CoreOutcome {
    pub manifest: ProjectManifest,
    pub message: AgentMessage,
}

fn user_prompt(context: &AgentContext) -> String {
    let mut prompt = String::new();
    if let Some(memory) = &context.memory_context {
        if !memory.is_empty() {
            prompt.push_str("Relevant project memory:\n");
            prompt.push_str(memory);
            prompt.push_str("\n\n");
        }
    }
    prompt.push_str(&format!(
        "Project name: {}\nSpecification:\n{}\n",
        context.project_name, context.spec
    ));
    prompt
}

/// Runs the Core agent (§4.5 generate step 2).
///
/// Two distinct failure modes are handled differently, per §4.5 "Failure
/// semantics": a *missing router decision* (no provider at all for the
/// Reasoning task) is fatal for generation and is propagated as `Err` for
/// the orchestrator to raise; an *available* provider that returns
/// invalid output — unparseable JSON, or a manifest that fails
/// [`manifest::validate`] — instead substitutes
/// [`manifest::default_manifest`] with a reduced confidence, per §4.4
/// "On invalid LLM output, emits the default manifest".
pub async fn run_core(router: &Router, context: &AgentContext) -> Result<CoreOutcome, RouterError> {
    let request = CompletionRequest::new(user_prompt(context), system_prompt(Role::Core));

    let completion = match router.complete(Role::Core.task_type(), request).await {
        Ok(response) => response,
        Err(error @ RouterError::NoProvider { .. }) => return Err(error),
        Err(error @ RouterError::Adapter { .. }) => {
            tracing::warn!(%error, "Core agent: provider call failed, substituting default manifest");
            let manifest = manifest::default_manifest(&context.project_name, &context.spec);
            let message = AgentMessage::new(
                Role::Core,
                format!("Substituted the default manifest: {error}"),
                "the Reasoning provider's call failed",
                0.1,
                Default::default(),
            );
            return Ok(CoreOutcome { manifest, message });
        }
    };

    Ok(match extract_json::<ProjectManifest>(&completion.text) {
        Some(candidate) if manifest::validate(&candidate).is_ok() => {
            let message = AgentMessage::new(
                Role::Core,
                "Produced a project manifest from the specification.",
                "manifest parsed and passed schema validation",
                0.9,
                Default::default(),
            );
            CoreOutcome {
                manifest: candidate,
                message,
            }
        }
        Some(candidate) => {
            let violation = manifest::validate(&candidate).unwrap_err();
            tracing::warn!(%violation, "Core agent: manifest failed schema validation, substituting default");
            let manifest = manifest::default_manifest(&context.project_name, &context.spec);
            let message = AgentMessage::new(
                Role::Core,
                format!("Substituted the default manifest: {violation}"),
                "LLM manifest failed schema validation",
                0.2,
                Default::default(),
            );
            CoreOutcome { manifest, message }
        }
        None => {
            tracing::warn!("Core agent: LLM output was not parseable JSON, substituting default manifest");
            let manifest = manifest::default_manifest(&context.project_name, &context.spec);
            let message = AgentMessage::new(
                Role::Core,
                "Substituted the default manifest: LLM output was not valid JSON.",
                "tolerant JSON extraction failed on the raw completion",
                0.1,
                Default::default(),
            );
            CoreOutcome { manifest, message }
        }
    })
}
