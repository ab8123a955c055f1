//! Shared Types
//!
//! Domain types and the unified error system used across the crate.

mod domain;
mod error;

pub use domain::{
    BoundingBox, ConversationContext, ConversationTheme, ConversationTurn, DetectedObject,
    SceneUnderstanding, Sender, WordInfo, fallback_themes,
};
pub use error::{
    ErrorCategory, ErrorClassifier, LingoError, ProviderError, Result, ResultExt,
};
