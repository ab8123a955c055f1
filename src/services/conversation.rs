//! Conversation Service
//!
//! Theme generation and the role-play tutoring replies. Like the
//! recognition service, every method is total: provider failures produce
//! the canned fallbacks, logged at warn level.

use tracing::{info, warn};

use crate::ai::{ChatMessage, GenerationOptions, SharedProvider, normalize, prompt};
use crate::types::{ConversationContext, ConversationTheme, SceneUnderstanding, fallback_themes};

pub struct ConversationService {
    chat: SharedProvider,
}

impl ConversationService {
    pub fn new(chat: SharedProvider) -> Self {
        Self { chat }
    }

    /// Role-play themes derived from the scene understanding.
    pub async fn generate_themes(&self, scene: &SceneUnderstanding) -> Vec<ConversationTheme> {
        let result = self
            .chat
            .chat(
                &[ChatMessage::user(prompt::themes_prompt(scene))],
                &GenerationOptions::json(1024),
            )
            .await;

        match result {
            Ok(reply) => {
                info!(provider = %reply.provider, "theme generation succeeded");
                normalize::normalize_themes(&reply.text, &scene.scene)
            }
            Err(e) => {
                warn!(error = %e, "theme generation degraded to canned themes");
                fallback_themes(&scene.scene)
            }
        }
    }

    /// One tutoring reply for the new message, in character for the
    /// session's role and theme.
    pub async fn generate_reply(&self, context: &ConversationContext, message: &str) -> String {
        let messages = prompt::build_prompt_messages(context, message);
        let result = self
            .chat
            .chat(&messages, &GenerationOptions::text(300))
            .await;

        match result {
            Ok(reply) => {
                let text = normalize::normalize_reply(&reply.text);
                if text.is_empty() {
                    warn!("empty tutoring reply, using fallback");
                    fallback_reply(message, &context.role, &context.theme)
                } else {
                    text
                }
            }
            Err(e) => {
                warn!(error = %e, "tutoring reply degraded to fallback");
                fallback_reply(message, &context.role, &context.theme)
            }
        }
    }
}

fn fallback_reply(message: &str, role: &str, theme: &str) -> String {
    format!("As a {role}, regarding '{message}', let's discuss this further in our '{theme}' scenario.")
}
