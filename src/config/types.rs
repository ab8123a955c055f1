//! Configuration Types
//!
//! Serde-backed configuration tree with built-in defaults. API keys and the
//! gateway app secret are plain strings here (figment needs to deserialize
//! them) but are converted to `SecretString` by the providers and never
//! logged.

use serde::{Deserialize, Serialize};

use crate::types::{LingoError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub video: VideoConfig,
}

impl Config {
    /// Validate cross-field constraints after loading.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(LingoError::Config("server.port must be non-zero".into()));
        }
        if self.providers.chat_order.is_empty() {
            return Err(LingoError::Config(
                "providers.chat_order must name at least one provider".into(),
            ));
        }
        for name in self
            .providers
            .chat_order
            .iter()
            .chain(self.providers.vision_order.iter())
        {
            if !matches!(name.as_str(), "zhipu" | "vivo") {
                return Err(LingoError::Config(format!(
                    "unknown provider '{name}' in provider order (valid: zhipu, vivo)"
                )));
            }
        }
        Ok(())
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory uploaded photos are stored in and served from
    pub upload_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            upload_dir: "static/uploads".to_string(),
        }
    }
}

/// SQLite settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "lingowizz.db".to_string(),
        }
    }
}

/// All remote AI provider settings, plus the fallback order per call kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Chat providers in fallback order (first is primary)
    pub chat_order: Vec<String>,
    /// Vision providers in fallback order
    pub vision_order: Vec<String>,
    #[serde(default)]
    pub zhipu: ZhipuConfig,
    #[serde(default)]
    pub vivo: VivoConfig,
    #[serde(default)]
    pub huggingface: HuggingFaceConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            chat_order: vec!["zhipu".to_string(), "vivo".to_string()],
            vision_order: vec!["zhipu".to_string()],
            zhipu: ZhipuConfig::default(),
            vivo: VivoConfig::default(),
            huggingface: HuggingFaceConfig::default(),
        }
    }
}

/// Zhipu open platform (bearer-token chat/vision API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZhipuConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    pub api_base: String,
    pub chat_model: String,
    pub vision_model: String,
    pub timeout_secs: u64,
}

impl Default for ZhipuConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://open.bigmodel.cn/api/paas/v4".to_string(),
            chat_model: "glm-4-flash-250414".to_string(),
            vision_model: "glm-4v-flash".to_string(),
            timeout_secs: 15,
        }
    }
}

/// Vivo AI gateway (HMAC-signed requests).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VivoConfig {
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub app_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for VivoConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            app_key: None,
            api_base: "https://api-ai.vivo.com.cn".to_string(),
            model: "vivo-BlueLM-TB-Pro".to_string(),
            timeout_secs: 15,
        }
    }
}

/// HuggingFace inference API used for object detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuggingFaceConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    pub api_base: String,
    pub detection_model: String,
    pub timeout_secs: u64,
    /// Detections below this confidence are discarded
    pub min_confidence: f32,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api-inference.huggingface.co".to_string(),
            detection_model: "facebook/detr-resnet-50".to_string(),
            timeout_secs: 30,
            min_confidence: 0.4,
        }
    }
}

/// Video search backend for the recommendation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.bilibili.com/x/web-interface/search/all/v2".to_string(),
            timeout_secs: 10,
        }
    }
}
