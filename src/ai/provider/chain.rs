//! Fallback Provider Chain
//!
//! Cascading provider attempts with error-classified routing:
//!
//! 1. Try the primary provider, retrying with exponential backoff and
//!    jitter on retryable categories.
//! 2. On auth/unavailable/bad-request errors, fall over to the next
//!    provider immediately.
//! 3. Continue until success or all providers are exhausted.
//!
//! Vision calls skip providers without a vision endpoint.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::{ChatMessage, GenerationOptions, ModelProvider, RawModelReply, SharedProvider};
use crate::constants::chain as chain_constants;
use crate::types::{ErrorCategory, LingoError, ProviderError, Result};

/// Retry and backoff settings for the chain.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Retries per provider before falling over
    pub max_retries: u8,
    /// Base delay for exponential backoff
    pub base_delay: Duration,
    /// Cap on the backoff delay
    pub max_delay: Duration,
    /// Backoff multiplier
    pub backoff_factor: f32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_retries: chain_constants::MAX_RETRIES_PER_PROVIDER,
            base_delay: Duration::from_millis(chain_constants::BASE_DELAY_MS),
            max_delay: Duration::from_secs(chain_constants::MAX_DELAY_SECS),
            backoff_factor: chain_constants::BACKOFF_FACTOR,
        }
    }
}

/// One call borrowed from the trait method arguments, so the retry loop
/// can replay it against successive providers.
enum Call<'a> {
    Chat(&'a [ChatMessage], &'a GenerationOptions),
    Vision(&'a str, &'a [u8], &'a GenerationOptions),
}

impl Call<'_> {
    fn needs_vision(&self) -> bool {
        matches!(self, Self::Vision(..))
    }

    async fn invoke(&self, provider: &SharedProvider) -> Result<RawModelReply> {
        match self {
            Self::Chat(messages, options) => provider.chat(messages, options).await,
            Self::Vision(prompt, image, options) => {
                provider.chat_with_image(prompt, image, options).await
            }
        }
    }
}

/// Ordered providers with fallback semantics.
#[derive(Clone)]
pub struct ProviderChain {
    providers: Vec<SharedProvider>,
    config: ChainConfig,
}

impl ProviderChain {
    pub fn new(providers: Vec<SharedProvider>, config: ChainConfig) -> Self {
        Self { providers, config }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Run the call against each eligible provider in order, retrying per
    /// the classified error category.
    async fn execute(&self, call: Call<'_>) -> Result<RawModelReply> {
        if self.providers.is_empty() {
            return Err(LingoError::Config("provider chain is empty".to_string()));
        }

        let vision = call.needs_vision();
        let mut last_error: Option<LingoError> = None;

        for provider in &self.providers {
            let name = provider.name().to_string();

            if vision && !provider.supports_vision() {
                debug!(provider = %name, "skipping provider without vision support");
                continue;
            }

            let mut delay = self.config.base_delay;

            for attempt in 1..=self.config.max_retries {
                debug!(provider = %name, attempt, "chain attempt");

                match call.invoke(provider).await {
                    Ok(reply) => {
                        if attempt > 1 || last_error.is_some() {
                            info!(provider = %name, attempt, "chain succeeded after retries");
                        }
                        return Ok(reply);
                    }
                    Err(err) => {
                        let category = classify(&err);
                        warn!(
                            provider = %name,
                            attempt,
                            category = %category,
                            error = %err,
                            "provider call failed"
                        );
                        last_error = Some(err);

                        if category.should_fall_over() {
                            info!(provider = %name, "falling over to next provider");
                            break;
                        }

                        if attempt < self.config.max_retries {
                            let wait = match category {
                                ErrorCategory::RateLimit => category.recommended_delay(),
                                _ => delay + random_jitter(delay),
                            };
                            debug!(wait_ms = wait.as_millis(), "retrying after backoff");
                            sleep(wait).await;
                            delay = next_backoff(
                                delay,
                                self.config.backoff_factor,
                                self.config.max_delay,
                            );
                        }
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            LingoError::Provider(ProviderError::new(
                ErrorCategory::Unavailable,
                if vision {
                    "no provider in chain supports vision"
                } else {
                    "all providers in chain failed"
                },
                "chain",
            ))
        }))
    }
}

#[async_trait]
impl ModelProvider for ProviderChain {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<RawModelReply> {
        self.execute(Call::Chat(messages, options)).await
    }

    async fn chat_with_image(
        &self,
        prompt: &str,
        image: &[u8],
        options: &GenerationOptions,
    ) -> Result<RawModelReply> {
        self.execute(Call::Vision(prompt, image, options)).await
    }

    fn supports_vision(&self) -> bool {
        self.providers.iter().any(|p| p.supports_vision())
    }

    fn name(&self) -> &str {
        "provider-chain"
    }

    async fn health_check(&self) -> Result<bool> {
        for provider in &self.providers {
            if provider.health_check().await.unwrap_or(false) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn classify(err: &LingoError) -> ErrorCategory {
    match err {
        LingoError::Provider(p) => p.category,
        _ => ErrorCategory::Unknown,
    }
}

fn random_jitter(base_delay: Duration) -> Duration {
    let max_jitter_ms = (base_delay.as_millis() as u64) / 4;
    if max_jitter_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..max_jitter_ms))
}

fn next_backoff(current: Duration, factor: f32, max: Duration) -> Duration {
    std::cmp::min(Duration::from_secs_f32(current.as_secs_f32() * factor), max)
}
