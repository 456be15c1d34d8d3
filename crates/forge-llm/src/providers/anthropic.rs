//! Anthropic / Claude completion adapter.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::adapter::{
    classify_status, Adapter, AdapterError, AdapterErrorClass, AdapterMetadata, CompletionRequest,
    CompletionResponse,
};

/// Anthropic completion adapter.
pub struct AnthropicAdapter {
    client: reqwest::Client,
    api_key: Option<String>,
    model: &'static str,
    id: &'static str,
    metadata: AdapterMetadata,
}

impl AnthropicAdapter {
    pub const API_URL: &'static str = "https://api.anthropic.com/v1/messages";
    pub const API_VERSION: &'static str = "2023-06-01";

    pub fn new(client: reqwest::Client, id: &'static str, model: &'static str, metadata: AdapterMetadata) -> Self {
        Self {
            client,
            api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            model,
            id,
            metadata,
        }
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<AnthropicMessage>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<AnthropicContentBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text { text: String },
    Image { source: AnthropicImageSource },
}

#[derive(Serialize)]
struct AnthropicImageSource {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'static str,
    data: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseBlock>,
}

#[derive(Deserialize)]
struct AnthropicResponseBlock {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl Adapter for AnthropicAdapter {
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
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AdapterError::Unavailable("anthropic"))?;
        if request.image_data.is_some() && !self.metadata.supports_vision {
            return Err(AdapterError::NoVisionSupport("anthropic"));
        }

        let mut content = vec![AnthropicContentBlock::Text {
            text: request.user_prompt.clone(),
        }];
        if let Some(image) = &request.image_data {
            content.push(AnthropicContentBlock::Image {
                source: AnthropicImageSource {
                    kind: "base64",
                    media_type: "image/png",
                    data: {
                        use base64::Engine as _;
                        base64::engine::general_purpose::STANDARD.encode(image)
                    },
                },
            });
        }

        let body = AnthropicRequest {
            model: self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system_prompt,
            messages: vec![AnthropicMessage {
                role: "user",
                content,
            }],
        };

        let started = Instant::now();
        let response = self
            .client
            .post(Self::API_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", Self::API_VERSION)
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

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Fatal(format!("malformed response body: {e}")))?;

        let text = parsed
            .content
            .into_iter()
            .map(|b| b.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(CompletionResponse {
            text,
            latency: started.elapsed(),
        })
    }
}
