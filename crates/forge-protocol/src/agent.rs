//! Agent polymorphism primitives (§4.4, §9 "Agent polymorphism" design
//! note). Agents are modelled as a value with a fixed `role`, a bound
//! `task`, and an `execute` closure rather than an inheritance hierarchy —
//! `forge-agents` supplies the closures, this crate only supplies the
//! shared vocabulary so `forge-protocol` stays free of any LLM-calling
//! code.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The task type a Router selection is made for (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Reasoning,
    Code,
    UiText,
}

/// The fixed set of agent roles (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Core,
    Arch,
    Backend,
    Uix,
    Debug,
    Quality,
    Test,
    Edit,
}

impl Role {
    /// The task type each role is bound to (§4.4 role table). The Router's
    /// default task-to-provider mapping is advisory; a per-agent task
    /// binding always wins, per the Open Question resolution in §9: "use
    /// the agent's declared task binding, not the Router default."
    pub fn task_type(self) -> TaskType {
        match self {
            Role::Core | Role::Arch => TaskType::Reasoning,
            Role::Backend | Role::Debug | Role::Quality | Role::Test | Role::Edit => {
                TaskType::Code
            }
            Role::Uix => TaskType::UiText,
        }
    }

    /// Fixed pipeline order for the generate pipeline (§4.5 step 3):
    /// ARCH → BACKEND → UIX → TEST → QUALITY → DEBUG. Core runs before
    /// this ordering (it produces the manifest the ordering consumes) and
    /// Edit never participates in `generate`, only `edit`.
    pub const GENERATE_ORDER: [Role; 6] = [
        Role::Arch,
        Role::Backend,
        Role::Uix,
        Role::Test,
        Role::Quality,
        Role::Debug,
    ];
}

/// A proposed filepath→content mapping emitted by one agent run (§4.4
/// "Artifact" in the GLOSSARY).
pub type Artifacts = BTreeMap<String, String>;

/// The message an agent's `execute` returns (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub role: Role,
    pub content: String,
    pub reasoning_summary: String,
    /// Confidence in `[0, 1]`. Construct via [`AgentMessage::new`], which
    /// clamps out-of-range values rather than accepting a malformed
    /// confidence silently.
    confidence: f32,
    pub artifacts: Artifacts,
}

impl AgentMessage {
    pub fn new(
        role: Role,
        content: impl Into<String>,
        reasoning_summary: impl Into<String>,
        confidence: f32,
        artifacts: Artifacts,
    ) -> Self {
        Self {
            role,
            content: content.into(),
            reasoning_summary: reasoning_summary.into(),
            confidence: confidence.clamp(0.0, 1.0),
            artifacts,
        }
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }
}

/// Transient context an Orchestrator holds during one request (§3
/// "Ownership"). Never persisted; never crosses a process boundary.
#[derive(Debug, Clone, Default)]
pub struct AgentContext {
    pub project_name: String,
    pub project_id: String,
    pub spec: String,
    pub image_data: Option<Vec<u8>>,
    pub current_files: Artifacts,
    pub messages: Vec<AgentMessage>,
    pub memory_context: Option<String>,
    /// The natural-language edit instruction, set only for the `edit`
    /// pipeline's Edit agent invocation (§4.5 "edit" step 2).
    pub instruction: Option<String>,
    /// The current repair directive (formatted validation issues),
    /// threaded to the Debug/Quality agents during a repair iteration
    /// (§4.5 "generate" step 5). `None` outside a repair loop.
    pub directive: Option<String>,
}

impl AgentContext {
    pub fn new(project_name: impl Into<String>, project_id: impl Into<String>, spec: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            project_id: project_id.into(),
            spec: spec.into(),
            ..Default::default()
        }
    }

    /// Merge a freshly-produced artifact set into the accumulated view
    /// later agents see, and record the message that produced it
    /// (§4.5 step 3: "later agents see earlier artifacts").
    pub fn absorb(&mut self, message: AgentMessage) {
        for (path, content) in &message.artifacts {
            self.current_files.insert(path.clone(), content.clone());
        }
        self.messages.push(message);
    }
}
