//! Uniform async text-completion capability over multiple backends (§4.1).

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use forge_protocol::agent::TaskType;

/// Per-adapter metadata the Router uses to decide fit, independent of
/// live health (§4.1 "metadata").
#[derive(Debug, Clone, Copy)]
pub struct AdapterMetadata {
    pub max_context_tokens: u32,
    pub supports_streaming: bool,
    pub supports_vision: bool,
    /// Tasks this adapter is the *preferred* choice for in the Router's
    /// static priority map (§4.2). An adapter with no task in common
    /// with the one being routed is still eligible — this only affects
    /// ordering among the available candidates, not eligibility.
    pub preferred_for: &'static [TaskType],
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub user_prompt: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub image_data: Option<Vec<u8>>,
}

impl CompletionRequest {
    pub fn new(user_prompt: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            system_prompt: system_prompt.into(),
            max_tokens: 4096,
            temperature: 0.2,
            image_data: None,
        }
    }

    pub fn with_image(mut self, image_data: Vec<u8>) -> Self {
        self.image_data = Some(image_data);
        self
    }
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
    pub latency: Duration,
}

/// §7 error taxonomy, narrowed to what an adapter itself can raise. The
/// Router widens `Transient`/`Fatal` into `ForgeError::ProviderTransient`
/// / `ProviderFatal`.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("credentials not configured for {0}")]
    Unavailable(&'static str),
    #[error("image data supplied but {0} has no vision capability")]
    NoVisionSupport(&'static str),
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("fatal failure: {0}")]
    Fatal(String),
}

impl AdapterError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdapterError::Transient(_))
    }
}

/// One LLM backend. Implementations carry their own endpoint URL,
/// authentication headers, request/response shape, and tuning (§4.1).
/// `complete` does not retry internally — that responsibility belongs to
/// the Router/Orchestrator, per §4.1 "it does not retry internally".
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Stable identifier, e.g. `"anthropic-reasoning"`.
    fn id(&self) -> &'static str;

    fn model_id(&self) -> &'static str;

    fn metadata(&self) -> AdapterMetadata;

    /// Credentials present and not in a circuit-broken state. The
    /// circuit-broken half of this predicate is evaluated by the Router,
    /// which is why this only checks credentials.
    fn has_credentials(&self) -> bool;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AdapterError>;
}

/// Maps an HTTP status class to retryable vs. fatal, per §4.1 "Error
/// conditions".
pub fn classify_status(status: reqwest::StatusCode) -> AdapterErrorClass {
    if status.as_u16() == 429 || status.is_server_error() {
        AdapterErrorClass::Retryable
    } else {
        AdapterErrorClass::Fatal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterErrorClass {
    Retryable,
    Fatal,
}
