//! Image Recognition Service
//!
//! Scene understanding, object detection, and word definitions. Every
//! method here is total: provider failures degrade to the typed fallbacks
//! so a dead upstream never breaks the learning flow. Each degradation is
//! logged at warn level.

use tracing::{info, warn};

use crate::ai::{
    ChatMessage, GenerationOptions, SharedDetector, SharedProvider, normalize, prompt,
};
use crate::types::{DetectedObject, SceneUnderstanding, WordInfo};

pub struct RecognitionService {
    /// Vision-capable provider chain
    vision: SharedProvider,
    /// Text chat provider chain
    chat: SharedProvider,
    detector: SharedDetector,
}

impl RecognitionService {
    pub fn new(vision: SharedProvider, chat: SharedProvider, detector: SharedDetector) -> Self {
        Self {
            vision,
            chat,
            detector,
        }
    }

    /// Describe the photo as a structured scene.
    pub async fn understand_scene(&self, image: &[u8]) -> SceneUnderstanding {
        let result = self
            .vision
            .chat_with_image(
                &prompt::scene_understanding_prompt(),
                image,
                &GenerationOptions::text(500),
            )
            .await;

        match result {
            Ok(reply) => {
                info!(provider = %reply.provider, "scene understanding succeeded");
                normalize::normalize_scene(&reply.text)
            }
            Err(e) => {
                warn!(error = %e, "scene understanding degraded to fallback");
                SceneUnderstanding::fallback()
            }
        }
    }

    /// Locate objects in the photo, then refine each label with a vision
    /// follow-up where possible. Detection failure yields an empty list.
    pub async fn detect_objects(&self, image: &[u8]) -> Vec<DetectedObject> {
        let mut objects = match self.detector.detect(image).await {
            Ok(objects) => objects,
            Err(e) => {
                warn!(error = %e, "object detection degraded to empty result");
                return Vec::new();
            }
        };

        if objects.len() == 1 {
            // A single detection is worth a refinement pass over the whole
            // frame; with several objects the detector labels stand.
            let refined = self.identify_object(image).await;
            if refined != "unknown" {
                objects[0].name = refined;
            }
        }

        objects
    }

    /// Name the single primary object in the image.
    pub async fn identify_object(&self, image: &[u8]) -> String {
        let result = self
            .vision
            .chat_with_image(
                &prompt::identify_object_prompt(),
                image,
                &GenerationOptions::text(50),
            )
            .await;

        match result {
            Ok(reply) => {
                let name = normalize::normalize_reply(&reply.text).to_lowercase();
                if name.is_empty() {
                    "unknown".to_string()
                } else {
                    name
                }
            }
            Err(e) => {
                warn!(error = %e, "object identification degraded to 'unknown'");
                "unknown".to_string()
            }
        }
    }

    /// Dictionary-style definition for one word.
    pub async fn define_word(&self, word: &str) -> WordInfo {
        let result = self
            .chat
            .chat(
                &[ChatMessage::user(prompt::word_info_prompt(word))],
                &GenerationOptions::json(250),
            )
            .await;

        match result {
            Ok(reply) => normalize::normalize_word(&reply.text, word),
            Err(e) => {
                warn!(word, error = %e, "word definition degraded to fallback");
                WordInfo::fallback(word)
            }
        }
    }
}
