//! Zhipu Open Platform Provider
//!
//! Chat and vision completions against the Zhipu GLM API. Text calls use
//! the configured chat model; image calls use the vision model with the
//! image inlined as a base64 data URL.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{ChatMessage, GenerationOptions, ModelProvider, RawModelReply};
use crate::config::ZhipuConfig;
use crate::types::{ErrorCategory, ErrorClassifier, LingoError, ProviderError, Result};

const PROVIDER_NAME: &str = "zhipu";

/// Zhipu provider with secure API key handling.
pub struct ZhipuProvider {
    api_key: SecretString,
    api_base: String,
    chat_model: String,
    vision_model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for ZhipuProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZhipuProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("chat_model", &self.chat_model)
            .field("vision_model", &self.vision_model)
            .finish()
    }
}

impl ZhipuProvider {
    pub fn new(config: &ZhipuConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| LingoError::CredentialsMissing(PROVIDER_NAME.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LingoError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            api_base: config.api_base.clone(),
            chat_model: config.chat_model.clone(),
            vision_model: config.vision_model.clone(),
            client,
        })
    }

    async fn completions(&self, request: &CompletionRequest) -> Result<RawModelReply> {
        let url = format!("{}/chat/completions", self.api_base);
        debug!(model = %request.model, "sending Zhipu completion request");

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(request)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, PROVIDER_NAME))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_status(status, &body, PROVIDER_NAME).into());
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, PROVIDER_NAME))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                ProviderError::new(
                    ErrorCategory::ParseError,
                    "empty completion content",
                    PROVIDER_NAME,
                )
            })?;

        Ok(RawModelReply::new(content, PROVIDER_NAME))
    }
}

#[async_trait]
impl ModelProvider for ZhipuProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<RawModelReply> {
        let request = CompletionRequest {
            model: self.chat_model.clone(),
            messages: messages.iter().map(RequestMessage::text).collect(),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            response_format: options.json_output.then(|| json!({"type": "json_object"})),
            stream: false,
        };
        self.completions(&request).await
    }

    async fn chat_with_image(
        &self,
        prompt: &str,
        image: &[u8],
        options: &GenerationOptions,
    ) -> Result<RawModelReply> {
        let data_url = format!("data:image/jpeg;base64,{}", STANDARD.encode(image));
        let request = CompletionRequest {
            model: self.vision_model.clone(),
            messages: vec![RequestMessage {
                role: "user".to_string(),
                content: json!([
                    {"type": "text", "text": prompt},
                    {"type": "image_url", "image_url": {"url": data_url}}
                ]),
            }],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            // The vision endpoint has no structured-output mode
            response_format: None,
            stream: false,
        };
        self.completions(&request).await
    }

    fn supports_vision(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn health_check(&self) -> Result<bool> {
        let probe = CompletionRequest {
            model: self.chat_model.clone(),
            messages: vec![RequestMessage {
                role: "user".to_string(),
                content: json!("ping"),
            }],
            max_tokens: 1,
            temperature: 0.0,
            response_format: None,
            stream: false,
        };
        match self.completions(&probe).await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!(error = %e, "Zhipu health check failed");
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<RequestMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
    stream: bool,
}

/// Message whose content is either a plain string or the multimodal
/// content-part array, depending on the endpoint.
#[derive(Debug, Serialize)]
struct RequestMessage {
    role: String,
    content: Value,
}

impl RequestMessage {
    fn text(message: &ChatMessage) -> Self {
        let role = match message.role {
            super::ChatRole::System => "system",
            super::ChatRole::User => "user",
            super::ChatRole::Assistant => "assistant",
        };
        Self {
            role: role.to_string(),
            content: Value::String(message.content.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
