//! Core Domain Types
//!
//! Normalized shapes shared by the AI layer, the services, and the route
//! layer. Every AI-facing type here is "total": callers can destructure the
//! expected fields even when the remote call failed, because the normalizer
//! substitutes well-typed fallbacks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Normalized AI Results
// =============================================================================

/// Structured description of an uploaded photo.
///
/// Produced by the multimodal scene-understanding call and consumed by theme
/// generation. Always fully populated; see `ai::normalize` for the fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneUnderstanding {
    /// One-sentence summary of the image
    pub description: String,
    /// Key objects visible in the image
    #[serde(default)]
    pub objects: Vec<String>,
    /// Short phrase for the overall scene, e.g. "kitchen countertop"
    #[serde(default = "unknown_scene")]
    pub scene: String,
    /// Single word for the mood, e.g. "peaceful"
    #[serde(default = "neutral_mood")]
    pub mood: String,
}

fn unknown_scene() -> String {
    "unknown".to_string()
}

fn neutral_mood() -> String {
    "neutral".to_string()
}

impl SceneUnderstanding {
    /// Static fallback when every provider failed.
    pub fn fallback() -> Self {
        Self {
            description: "Could not describe the image. It contains various objects for learning."
                .to_string(),
            objects: Vec::new(),
            scene: "general".to_string(),
            mood: "educational".to_string(),
        }
    }

    /// Degenerate result for unparsable model output: keep the raw text as
    /// the description so nothing the model said is lost.
    pub fn from_raw_text(raw: impl Into<String>) -> Self {
        Self {
            description: raw.into(),
            objects: Vec::new(),
            scene: "unknown".to_string(),
            mood: "neutral".to_string(),
        }
    }
}

/// Dictionary-style information about a single word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordInfo {
    pub word: String,
    pub definition: String,
    pub example_sentence: String,
    pub pronunciation: String,
    pub part_of_speech: String,
}

impl WordInfo {
    /// Canned definition template still containing the requested word.
    pub fn fallback(word: &str) -> Self {
        Self {
            word: word.to_string(),
            definition: "A common object found in everyday life.".to_string(),
            example_sentence: format!("I see a {word}."),
            pronunciation: format!("/{word}/"),
            part_of_speech: "noun".to_string(),
        }
    }
}

/// A role-play scenario offered to the learner after scene understanding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTheme {
    #[serde(default)]
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Role the assistant plays, e.g. "Chef"
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub scenario: String,
}

fn default_role() -> String {
    "Teacher".to_string()
}

/// Canned themes used when theme generation fails entirely. Keyed off the
/// scene so a kitchen photo still gets kitchen-flavored scenarios.
pub fn fallback_themes(scene: &str) -> Vec<ConversationTheme> {
    if scene.to_lowercase().contains("kitchen") {
        return vec![
            theme(
                1,
                "Kitchen Cooking Assistant",
                "Chef",
                "Practice cooking vocabulary while preparing a meal together.",
            ),
            theme(
                2,
                "Healthy Eating Advisor",
                "Nutritionist",
                "Discuss the ingredients in the photo and their benefits.",
            ),
            theme(
                3,
                "Grocery Shopping Helper",
                "Shopping Assistant",
                "Plan a shopping trip for the items you can see.",
            ),
            theme(
                4,
                "Food Culture Explorer",
                "Cultural Guide",
                "Explore how these foods are used around the world.",
            ),
        ];
    }
    vec![theme(
        1,
        "General Learning Assistant",
        "Teacher",
        "Talk about the objects in the photo and learn their names.",
    )]
}

fn theme(id: u32, title: &str, role: &str, scenario: &str) -> ConversationTheme {
    ConversationTheme {
        id,
        title: title.to_string(),
        description: scenario.to_string(),
        role: role.to_string(),
        background: scenario.to_string(),
        scenario: scenario.to_string(),
    }
}

// =============================================================================
// Object Detection
// =============================================================================

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: i32,
    pub ymin: i32,
    pub xmax: i32,
    pub ymax: i32,
}

/// One object found by the remote detection API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    /// 1-based index within the detection result
    pub id: u32,
    /// Label, possibly refined by a vision-model follow-up call
    pub name: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

// =============================================================================
// Conversation Context
// =============================================================================

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// One message within a session transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub session_id: String,
    pub sender: Sender,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Everything the reply generator needs, owned by the caller.
///
/// The route layer loads the recent transcript from storage and hands it in;
/// the AI layer never touches process-wide mutable history.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    pub session_id: String,
    /// Role the assistant plays in this session
    pub role: String,
    /// Theme title, e.g. "Kitchen Cooking Assistant"
    pub theme: String,
    /// Scenario background text
    pub background: String,
    /// Recent turns, oldest first
    pub history: Vec<ConversationTurn>,
}

impl ConversationContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            role: "Assistant".to_string(),
            theme: "General Chat".to_string(),
            background: String::new(),
            history: Vec::new(),
        }
    }
}
