//! Configuration Loader (Figment-based)
//!
//! Merge order, lowest priority first:
//! 1. Built-in defaults (Serialized)
//! 2. Config file (lingowizz.toml next to the binary, or --config path)
//! 3. Environment variables (LINGOWIZZ_* prefix)

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use tracing::debug;

use super::types::Config;
use crate::types::{LingoError, Result};

const DEFAULT_CONFIG_FILE: &str = "lingowizz.toml";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with the full resolution chain.
    pub fn load(config_path: Option<&Path>) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        let path = config_path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        if path.exists() {
            debug!("Loading config from: {}", path.display());
            figment = figment.merge(Toml::file(path));
        }

        // LINGOWIZZ_SERVER_PORT -> server.port, etc.
        figment = figment.merge(Env::prefixed("LINGOWIZZ_").split("_").lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| LingoError::Config(format!("Configuration error: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Write a commented default config file, refusing to clobber unless forced.
    pub fn init_file(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            return Err(LingoError::Config(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            )));
        }
        std::fs::write(path, Self::default_config_file())?;
        Ok(())
    }

    /// Show the current effective configuration.
    pub fn show_config(config_path: Option<&Path>, as_json: bool) -> Result<()> {
        let config = Self::load(config_path)?;
        if as_json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config).map_err(|e| LingoError::Config(e.to_string()))?
            );
        }
        Ok(())
    }

    fn default_config_file() -> String {
        r#"# LingoWizz Configuration
# Values here override built-in defaults; LINGOWIZZ_* environment
# variables override both (e.g. LINGOWIZZ_SERVER_PORT=8080).

[server]
host = "0.0.0.0"
port = 5000
upload_dir = "static/uploads"

[database]
path = "lingowizz.db"

[providers]
# Fallback order per call kind; first entry is the primary provider.
chat_order = ["zhipu", "vivo"]
vision_order = ["zhipu"]

[providers.zhipu]
# api_key = "..."
chat_model = "glm-4-flash-250414"
vision_model = "glm-4v-flash"
timeout_secs = 15

[providers.vivo]
# app_id = "..."
# app_key = "..."
model = "vivo-BlueLM-TB-Pro"
timeout_secs = 15

[providers.huggingface]
# api_key = "..."
detection_model = "facebook/detr-resnet-50"
timeout_secs = 30
min_confidence = 0.4

[video]
api_base = "https://api.bilibili.com/x/web-interface/search/all/v2"
timeout_secs = 10
"#
        .to_string()
    }
}
