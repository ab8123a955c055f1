//! Model Provider Abstraction
//!
//! Defines the `ModelProvider` trait for chat and vision calls, and the
//! `ObjectDetector` trait for the detection API. Providers return a
//! [`RawModelReply`]; typed interpretation happens once, in
//! [`crate::ai::normalize`].
//!
//! ## Modules
//!
//! - `chain`: fallback provider chain with per-provider retries
//! - `zhipu`: Zhipu open platform (bearer-token chat/vision)
//! - `vivo`: Vivo AI gateway (HMAC-signed chat)
//! - `huggingface`: HuggingFace inference API (object detection)

mod chain;
mod huggingface;
mod vivo;
mod zhipu;

pub use chain::{ChainConfig, ProviderChain};
pub use huggingface::HuggingFaceDetector;
pub use vivo::VivoProvider;
pub use zhipu::ZhipuProvider;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ProvidersConfig;
use crate::types::{DetectedObject, LingoError, Result};

// =============================================================================
// Chat Messages
// =============================================================================

/// Conversation role understood by the chat APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message in a chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: String) -> Self {
        Self { role, content }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content.into())
    }
}

/// Generation knobs forwarded to the provider.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub temperature: f32,
    /// Ask the provider to constrain output to a JSON object, where supported
    pub json_output: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            temperature: 0.7,
            json_output: false,
        }
    }
}

impl GenerationOptions {
    pub fn json(max_tokens: u32) -> Self {
        Self {
            max_tokens,
            json_output: true,
            ..Self::default()
        }
    }

    pub fn text(max_tokens: u32) -> Self {
        Self {
            max_tokens,
            ..Self::default()
        }
    }
}

/// The raw text a provider returned, before any interpretation.
///
/// This is deliberately minimal: parsing into domain types happens exactly
/// once, in the normalize layer, regardless of which provider answered.
#[derive(Debug, Clone)]
pub struct RawModelReply {
    pub text: String,
    /// Name of the provider that produced this reply
    pub provider: String,
}

impl RawModelReply {
    pub fn new(text: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provider: provider.into(),
        }
    }
}

// =============================================================================
// Provider Traits
// =============================================================================

/// A chat (and optionally vision) model provider.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Text-only chat completion.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<RawModelReply>;

    /// Multimodal completion: a text instruction plus one image.
    ///
    /// Default declines, for providers without a vision endpoint.
    async fn chat_with_image(
        &self,
        _prompt: &str,
        _image: &[u8],
        _options: &GenerationOptions,
    ) -> Result<RawModelReply> {
        Err(LingoError::Provider(crate::types::ProviderError {
            category: crate::types::ErrorCategory::BadRequest,
            message: format!("provider '{}' has no vision endpoint", self.name()),
            provider: self.name().to_string(),
        }))
    }

    /// Whether this provider can handle image inputs.
    fn supports_vision(&self) -> bool {
        false
    }

    fn name(&self) -> &str;

    /// Cheap liveness probe.
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Remote object detection over raw image bytes.
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    async fn detect(&self, image: &[u8]) -> Result<Vec<DetectedObject>>;

    fn name(&self) -> &str;
}

/// Shared provider handle used across services.
pub type SharedProvider = Arc<dyn ModelProvider>;

/// Shared detector handle.
pub type SharedDetector = Arc<dyn ObjectDetector>;

// =============================================================================
// Factory
// =============================================================================

/// Build one provider by name from the configuration.
///
/// Returns `CredentialsMissing` when the named provider has no credentials
/// configured; the chain builder treats that as "skip this provider".
pub fn create_provider(name: &str, config: &ProvidersConfig) -> Result<SharedProvider> {
    match name {
        "zhipu" => Ok(Arc::new(ZhipuProvider::new(&config.zhipu)?)),
        "vivo" => Ok(Arc::new(VivoProvider::new(&config.vivo)?)),
        other => Err(LingoError::Config(format!("unknown provider '{other}'"))),
    }
}

/// Build the ordered provider list for one call kind, skipping providers
/// without credentials. Errors only when the result would be empty.
pub fn build_provider_order(order: &[String], config: &ProvidersConfig) -> Result<Vec<SharedProvider>> {
    let mut providers = Vec::new();
    for name in order {
        match create_provider(name, config) {
            Ok(provider) => {
                debug!(provider = %name, "provider configured");
                providers.push(provider);
            }
            Err(LingoError::CredentialsMissing(_)) => {
                warn!(provider = %name, "skipping provider with no credentials");
            }
            Err(e) => return Err(e),
        }
    }
    if providers.is_empty() {
        return Err(LingoError::Config(
            "no provider in the configured order has credentials".to_string(),
        ));
    }
    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProvidersConfig;

    #[test]
    fn test_unknown_provider_name_rejected() {
        let config = ProvidersConfig::default();
        assert!(create_provider("openai", &config).is_err());
    }

    #[test]
    fn test_order_with_no_credentials_fails() {
        let config = ProvidersConfig::default();
        let order = vec!["zhipu".to_string(), "vivo".to_string()];
        assert!(build_provider_order(&order, &config).is_err());
    }

    #[test]
    fn test_order_skips_unconfigured_providers() {
        let mut config = ProvidersConfig::default();
        config.zhipu.api_key = Some("test-key".to_string());
        let order = vec!["zhipu".to_string(), "vivo".to_string()];
        let providers = build_provider_order(&order, &config).unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].name(), "zhipu");
    }

    #[test]
    fn test_generation_options_presets() {
        let json = GenerationOptions::json(1024);
        assert!(json.json_output);
        assert_eq!(json.max_tokens, 1024);

        let text = GenerationOptions::text(300);
        assert!(!text.json_output);
    }
}
