//! The artifact-producing specialist agents: Backend, UIX, Test, Quality,
//! Debug, and Edit (§4.4). All six share the same contract — system
//! prompt plus accumulated context in, a `{filepath: content}` map out —
//! and differ only in which extra context they're given and how their
//! prompt is framed, so a single implementation serves all of them.

use forge_llm::adapter::CompletionRequest;
use forge_llm::Router;
use forge_protocol::agent::{AgentContext, AgentMessage, Role};

use crate::extractor::extract_json;
use crate::prompts::system_prompt;

/// Runs one of the Backend/UIX/Test/Quality/Debug/Edit roles against the
/// accumulated [`AgentContext`] (§4.5 generate step 3 / edit step 2).
///
/// On a router miss or unparseable output, "downgrades to a template
/// fallback" (§4.5 "Failure semantics") — an empty artifact set at a
/// sharply reduced confidence, rather than failing the pipeline. The
/// caller decides whether an empty contribution from a given role still
/// allows the pipeline to proceed (generation always does; only a
/// missing Core decision is fatal).
pub async fn run_artifact_agent(router: &Router, context: &AgentContext, role: Role) -> AgentMessage {
    let prompt = user_prompt(context, role);
    let request = CompletionRequest::new(prompt, system_prompt(role));

    let completion = match router.complete(role.task_type(), request).await {
        Ok(response) => response,
        Err(error) => {
            tracing::warn!(%error, role = ?role, "agent: no provider available, using template fallback");
            return AgentMessage::new(
                role,
                format!("No provider available for {role:?}; contributed no files."),
                "router returned no provider for this role's task",
                0.0,
                Default::default(),
            );
        }
    };

    match extract_json(&completion.text) {
        Some(artifacts) => AgentMessage::new(
            role,
            format!("Produced {} file(s).", artifact_count(&artifacts)),
            "artifact JSON parsed successfully",
            0.8,
            artifacts,
        ),
        None => {
            tracing::warn!(role = ?role, "agent: LLM output was not parseable JSON, using template fallback");
            AgentMessage::new(
                role,
                format!("Could not parse a file map from the {role:?} agent's output; contributed no files."),
                "tolerant JSON extraction failed on the raw completion",
                0.1,
                Default::default(),
            )
        }
    }
}

fn artifact_count(artifacts: &forge_protocol::agent::Artifacts) -> usize {
    artifacts.len()
}

fn user_prompt(context: &AgentContext, role: Role) -> String {
    let mut prompt = String::new();
    if let Some(memory) = &context.memory_context {
        if !memory.is_empty() {
            prompt.push_str("Relevant project memory:\n");
            prompt.push_str(memory);
            prompt.push_str("\n\n");
        }
    }
    prompt.push_str(&format!("Project: {}\n", context.project_name));
    prompt.push_str(&format!("Original specification:\n{}\n\n", context.spec));

    if !context.current_files.is_empty() {
        prompt.push_str("Current files:\n");
        for (path, content) in &context.current_files {
            prompt.push_str(&format!("--- {path} ---\n{content}\n"));
        }
        prompt.push('\n');
    }

    match role {
        Role::Quality | Role::Debug => {
            if let Some(directive) = &context.directive {
                prompt.push_str("Issues to fix:\n");
                prompt.push_str(directive);
                prompt.push('\n');
            }
        }
        Role::Edit => {
            if let Some(instruction) = &context.instruction {
                prompt.push_str("Requested change:\n");
                prompt.push_str(instruction);
                prompt.push('\n');
            }
            if context.image_data.is_some() {
                prompt.push_str("(An accompanying image was supplied with this instruction.)\n");
            }
        }
        _ => {}
    }

    prompt
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn user_prompt_includes_directive_for_debug_role() {
        let mut context = AgentContext::new("proj", "p1", "spec text");
        context.directive = Some("- [python_syntax] app.py:3: unexpected indent".to_string());
        let prompt = user_prompt(&context, Role::Debug);
        assert!(prompt.contains("unexpected indent"));
    }

    #[test]
    fn user_prompt_includes_instruction_for_edit_role() {
        let mut context = AgentContext::new("proj", "p1", "spec text");
        context.instruction = Some("rename the submit button to Save".to_string());
        let prompt = user_prompt(&context, Role::Edit);
        assert!(prompt.contains("Save"));
    }
}
