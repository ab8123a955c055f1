//! Vivo AI Gateway Provider
//!
//! Chat completions through the Vivo BlueLM gateway. Every request carries
//! the HMAC signed-header set from [`crate::ai::signature`]; the gateway
//! reports failures both as HTTP statuses and as non-zero `code` values
//! inside 200 responses, and both are classified for the chain.
//!
//! The gateway takes a single prompt string rather than a message list, so
//! the chat transcript is flattened before sending.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::{ChatMessage, ChatRole, GenerationOptions, ModelProvider, RawModelReply};
use crate::ai::signature::{self, GatewayCredentials};
use crate::config::VivoConfig;
use crate::types::{ErrorCategory, ErrorClassifier, LingoError, ProviderError, Result};

const PROVIDER_NAME: &str = "vivo";
const COMPLETIONS_URI: &str = "/vivogpt/completions";

pub struct VivoProvider {
    credentials: GatewayCredentials,
    api_base: String,
    model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for VivoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VivoProvider")
            .field("credentials", &self.credentials)
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl VivoProvider {
    pub fn new(config: &VivoConfig) -> Result<Self> {
        let credentials =
            GatewayCredentials::new(config.app_id.clone(), config.app_key.clone())
                .map_err(|_| LingoError::CredentialsMissing(PROVIDER_NAME.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LingoError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            credentials,
            api_base: config.api_base.clone(),
            model: config.model.clone(),
            client,
        })
    }

    async fn completions(&self, prompt: String, options: &GenerationOptions) -> Result<RawModelReply> {
        let query = BTreeMap::from([("requestId".to_string(), Uuid::new_v4().to_string())]);
        let headers = signature::sign(&self.credentials, "POST", COMPLETIONS_URI, &query)?;

        let request = CompletionRequest {
            prompt,
            model: self.model.clone(),
            session_id: Uuid::new_v4().to_string(),
            extra: RequestExtra {
                temperature: options.temperature,
                max_new_tokens: options.max_tokens,
            },
        };

        let url = format!("{}{}", self.api_base, COMPLETIONS_URI);
        debug!(model = %self.model, "sending Vivo gateway request");

        let mut builder = self.client.post(&url).query(&query);
        for (name, value) in headers.pairs() {
            builder = builder.header(name, value);
        }

        let response = builder
            .json(&request)
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

        if body.code != 0 {
            return Err(ErrorClassifier::classify_gateway_code(
                body.code,
                body.msg.as_deref().unwrap_or("no message"),
                PROVIDER_NAME,
            )
            .into());
        }

        let content = body
            .data
            .and_then(|d| d.content)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                ProviderError::new(
                    ErrorCategory::ParseError,
                    "gateway reply had no content",
                    PROVIDER_NAME,
                )
            })?;

        Ok(RawModelReply::new(content, PROVIDER_NAME))
    }
}

#[async_trait]
impl ModelProvider for VivoProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<RawModelReply> {
        self.completions(flatten_messages(messages), options).await
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}

/// Collapse a chat transcript into the single prompt string the gateway
/// accepts, labeling non-leading turns by speaker.
fn flatten_messages(messages: &[ChatMessage]) -> String {
    let mut parts = Vec::with_capacity(messages.len());
    for message in messages {
        match message.role {
            ChatRole::System => parts.push(message.content.clone()),
            ChatRole::User => parts.push(format!("User: {}", message.content)),
            ChatRole::Assistant => parts.push(format!("Assistant: {}", message.content)),
        }
    }
    parts.join("\n\n")
}

// Request/Response types

#[derive(Debug, Serialize)]
struct CompletionRequest {
    prompt: String,
    model: String,
    #[serde(rename = "sessionId")]
    session_id: String,
    extra: RequestExtra,
}

#[derive(Debug, Serialize)]
struct RequestExtra {
    temperature: f32,
    max_new_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    code: i64,
    #[serde(default)]
    data: Option<ResponseData>,
    #[serde(default)]
    msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials_is_credentials_error() {
        let err = VivoProvider::new(&VivoConfig::default()).unwrap_err();
        assert!(matches!(err, LingoError::CredentialsMissing(_)));
    }

    #[test]
    fn test_flatten_labels_speakers() {
        let messages = vec![
            ChatMessage::new(ChatRole::System, "You are a Chef.".to_string()),
            ChatMessage::new(ChatRole::User, "What is a whisk?".to_string()),
            ChatMessage::new(ChatRole::Assistant, "A mixing tool.".to_string()),
        ];
        let prompt = flatten_messages(&messages);
        assert!(prompt.starts_with("You are a Chef."));
        assert!(prompt.contains("User: What is a whisk?"));
        assert!(prompt.contains("Assistant: A mixing tool."));
    }

    #[test]
    fn test_request_serializes_session_id_camel_case() {
        let request = CompletionRequest {
            prompt: "hi".to_string(),
            model: "vivo-BlueLM-TB-Pro".to_string(),
            session_id: "s-1".to_string(),
            extra: RequestExtra {
                temperature: 0.7,
                max_new_tokens: 300,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["sessionId"], "s-1");
        assert_eq!(json["extra"]["max_new_tokens"], 300);
    }

    #[test]
    fn test_gateway_code_parsed_from_body() {
        let body: CompletionResponse = serde_json::from_str(
            r#"{"code": 1007, "msg": "content filtered"}"#,
        )
        .unwrap();
        assert_eq!(body.code, 1007);
        assert!(body.data.is_none());
    }

    #[test]
    fn test_success_body_parsed() {
        let body: CompletionResponse = serde_json::from_str(
            r#"{"code": 0, "data": {"content": "hello"}, "msg": "done"}"#,
        )
        .unwrap();
        assert_eq!(body.code, 0);
        assert_eq!(body.data.unwrap().content.unwrap(), "hello");
    }
}
