//! OpenAI completion adapter — the fast code specialist fallback (§4.2).

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::adapter::{
    classify_status, Adapter, AdapterError, AdapterErrorClass, AdapterMetadata, CompletionRequest,
    CompletionResponse,
};

pub struct OpenAiAdapter {
    client: reqwest::Client,
    api_key: Option<String>,
    model: &'static str,
    id: &'static str,
    metadata: AdapterMetadata,
}

impl OpenAiAdapter {
    pub const API_URL: &'static str = "https://api.openai.com/v1/chat/completions";

    pub fn new(client: reqwest::Client, id: &'static str, model: &'static str, metadata: AdapterMetadata) -> Self {
        Self {
            client,
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            model,
            id,
            metadata,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl Adapter for OpenAiAdapter {
    fn id(&self) -> &'static str {
        self.id
    }

    fn model_id(&self) -> &'static str {
        self.model
    }

    fn metadata(&self) -> AdapterMetadata {
        self.metadata
    }

    fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AdapterError> {
        let api_key = self.api_key.as_deref().ok_or(AdapterError::Unavailable("openai"))?;
        if request.image_data.is_some() && !self.metadata.supports_vision {
            return Err(AdapterError::NoVisionSupport("openai"));
        }

        let body = ChatRequest {
            model: self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user",
                    content: request.user_prompt.clone(),
                },
            ],
        };

        let started = Instant::now();
        let response = self
            .client
            .post(Self::API_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match classify_status(status) {
                AdapterErrorClass::Retryable => AdapterError::Transient(text),
                AdapterErrorClass::Fatal => AdapterError::Fatal(text),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Fatal(format!("malformed response body: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        Ok(CompletionResponse {
            text,
            latency: started.elapsed(),
        })
    }
}
