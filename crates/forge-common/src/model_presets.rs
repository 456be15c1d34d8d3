//! Static model preset table consulted by the Router's priority map
//! (§4.2). Instead of pairing a slug with a reasoning-effort level for a
//! single vendor's family, each preset here pairs a provider id with the
//! capability flags the Router and the LLM Adapter need (§4.1, §4.2).

use forge_protocol::agent::TaskType;

/// A model preset: one entry per (provider, model) pair the engine knows
/// how to call.
#[derive(Debug, Clone, Copy)]
pub struct ModelPreset {
    /// Stable identifier, e.g. `"anthropic-reasoning"`.
    pub id: &'static str,
    /// Display label.
    pub label: &'static str,
    /// Short human description.
    pub description: &'static str,
    /// Provider-specific model slug sent over the wire.
    pub model_slug: &'static str,
    /// Environment variable whose presence gates this preset's
    /// availability (§4.1 "availability predicate").
    pub credential_env_var: &'static str,
    pub max_context_tokens: u32,
    pub supports_streaming: bool,
    pub supports_vision: bool,
    /// Tasks for which this preset is the *preferred* provider in the
    /// Router's static priority map (§4.2).
    pub preferred_for: &'static [TaskType],
}

const PRESETS: &[ModelPreset] = &[
    ModelPreset {
        id: "anthropic-reasoning",
        label: "Claude (reasoning)",
        description: "Reasoning-specialist adapter used for manifest planning and architecture refinement",
        model_slug: "claude-opus-4.5",
        credential_env_var: "ANTHROPIC_API_KEY",
        max_context_tokens: 200_000,
        supports_streaming: true,
        supports_vision: true,
        preferred_for: &[TaskType::Reasoning],
    },
    ModelPreset {
        id: "anthropic-code",
        label: "Claude (code)",
        description: "Fast code-generation adapter used for backend/frontend/test/debug agents",
        model_slug: "claude-sonnet-4.5",
        credential_env_var: "ANTHROPIC_API_KEY",
        max_context_tokens: 200_000,
        supports_streaming: true,
        supports_vision: true,
        preferred_for: &[TaskType::Code],
    },
    ModelPreset {
        id: "openai-code",
        label: "GPT-5 Codex",
        description: "Fast code specialist, fallback for the Code task",
        model_slug: "gpt-5-codex",
        credential_env_var: "OPENAI_API_KEY",
        max_context_tokens: 128_000,
        supports_streaming: true,
        supports_vision: false,
        preferred_for: &[TaskType::Code],
    },
    ModelPreset {
        id: "openai-reasoning",
        label: "GPT-5 (high reasoning)",
        description: "Fallback reasoning adapter",
        model_slug: "gpt-5",
        credential_env_var: "OPENAI_API_KEY",
        max_context_tokens: 128_000,
        supports_streaming: true,
        supports_vision: true,
        preferred_for: &[TaskType::Reasoning],
    },
    ModelPreset {
        id: "google-uitext",
        label: "Gemini 2.5 Flash",
        description: "Text-quality adapter used for UI/Text agent work",
        model_slug: "gemini-2.5-flash",
        credential_env_var: "GOOGLE_API_KEY",
        max_context_tokens: 1_000_000,
        supports_streaming: true,
        supports_vision: true,
        preferred_for: &[TaskType::UiText],
    },
];

pub fn builtin_model_presets() -> &'static [ModelPreset] {
    PRESETS
}

pub fn preset_by_id(id: &str) -> Option<&'static ModelPreset> {
    PRESETS.iter().find(|p| p.id == id)
}
