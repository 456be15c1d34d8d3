//! Google / Gemini completion adapter — the UI/Text-quality adapter
//! (§4.2).

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::adapter::{
    classify_status, Adapter, AdapterError, AdapterErrorClass, AdapterMetadata, CompletionRequest,
    CompletionResponse,
};

pub struct GoogleAdapter {
    client: reqwest::Client,
    api_key: Option<String>,
    model: &'static str,
    id: &'static str,
    metadata: AdapterMetadata,
}

impl GoogleAdapter {
    fn endpoint(model: &str) -> String {
        format!("https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent")
    }

    pub fn new(client: reqwest::Client, id: &'static str, model: &'static str, metadata: AdapterMetadata) -> Self {
        Self {
            client,
            api_key: std::env::var("GOOGLE_API_KEY").ok(),
            model,
            id,
            metadata,
        }
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction")]
    system_instruction: GeminiContent,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    InlineData { inline_data: GeminiInlineData },
}

#[derive(Serialize)]
struct GeminiInlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiResponseContent,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl Adapter for GoogleAdapter {
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
        let api_key = self.api_key.as_deref().ok_or(AdapterError::Unavailable("google"))?;
        if request.image_data.is_some() && !self.metadata.supports_vision {
            return Err(AdapterError::NoVisionSupport("google"));
        }

        let mut parts = vec![GeminiPart::Text {
            text: request.user_prompt.clone(),
        }];
        if let Some(image) = &request.image_data {
            use base64::Engine as _;
            parts.push(GeminiPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: "image/png",
                    data: base64::engine::general_purpose::STANDARD.encode(image),
                },
            });
        }

        let body = GenerateContentRequest {
            contents: vec![GeminiContent { parts }],
            system_instruction: GeminiContent {
                parts: vec![GeminiPart::Text {
                    text: request.system_prompt.clone(),
                }],
            },
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            },
        };

        let started = Instant::now();
        let response = self
            .client
            .post(Self::endpoint(self.model))
            .header("x-goog-api-key", api_key)
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

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Fatal(format!("malformed response body: {e}")))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            text,
            latency: started.elapsed(),
        })
    }
}
